//! Demo command handlers registered by `cmdlink listen`.
//!
//! These stand in for device actions: they validate their parameters and log
//! what a real device would do with them.

use cmdlink_core::command::{Command, Dispatcher, HandlerError, HandlerResult};

/// Build the dispatcher used by `listen`.
pub fn demo_dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register("A0", move_to);
    dispatcher.register("B2", set_output);
    dispatcher.register("ECHO", echo);
    dispatcher
}

/// `A0 <x> <y>`: move to a position.
fn move_to(command: &mut Command) -> HandlerResult {
    let &[x, y] = command.parameters.as_slice() else {
        return Err(HandlerError::new(format!(
            "A0 expects 2 parameters, got {}",
            command.parameters.len()
        )));
    };
    tracing::info!("A0: move to ({x}, {y})");
    Ok(())
}

/// `B2 <channel> <level>`: drive an output channel.
fn set_output(command: &mut Command) -> HandlerResult {
    let &[channel, level, ..] = command.parameters.as_slice() else {
        return Err("B2 expects a channel and a level".into());
    };
    if !(0.0..=1.0).contains(&level) {
        return Err(HandlerError::new(format!("B2 level {level} outside 0..=1")));
    }
    tracing::info!("B2: channel {channel} -> {level}");
    Ok(())
}

fn echo(command: &mut Command) -> HandlerResult {
    tracing::info!("ECHO {:?}", command.parameters);
    Ok(())
}

#[cfg(test)]
mod tests {
    use cmdlink_core::command::{parse_commands, ExecutionStatus};

    use super::*;

    #[test]
    fn test_demo_handlers() {
        let dispatcher = demo_dispatcher();
        let mut commands = parse_commands(b"A0 1 2\nA0 1\nB2 3 0.5\nB2 3 7\nECHO\nC9 1\n");
        dispatcher.execute_all(&mut commands);

        let statuses: Vec<ExecutionStatus> = commands.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            [
                ExecutionStatus::Executed,
                ExecutionStatus::Error,
                ExecutionStatus::Executed,
                ExecutionStatus::Error,
                ExecutionStatus::Executed,
                ExecutionStatus::Error,
            ]
        );
        assert_eq!(
            commands[5].error.as_deref(),
            Some("No callback registered for command: C9")
        );
    }
}
