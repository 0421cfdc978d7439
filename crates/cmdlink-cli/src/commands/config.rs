//! Config command implementation.

use anyhow::Result;

use cmdlink_core::config::{self, Config};
use cmdlink_core::session::BufferPolicy;

use super::{ConfigAction, ConfigArgs};

/// Run the config command.
pub async fn run(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match get_config_value(&config, &key) {
                Some(v) => println!("{}: {}", key, v),
                None => println!("Unknown configuration key: {}", key),
            }
        }

        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            if set_config_value(&mut config, &key, &value)? {
                config.validate()?;
                config.save()?;
                println!("Set {} = {}", key, value);
            } else {
                println!("Unknown configuration key: {}", key);
            }
        }

        ConfigAction::Show => {
            let config = Config::load()?;
            println!();
            println!("cmdlink configuration");
            println!("{}", "─".repeat(50));
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
            println!();
        }

        ConfigAction::Path => {
            println!("{}", Config::config_path().display());
        }

        ConfigAction::Reset => {
            Config::default().save()?;
            println!("Configuration reset to defaults.");
        }
    }

    Ok(())
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "link.chunk_size" => Some(config.link.chunk_size.to_string()),
        "link.listen_addr" => Some(config.link.listen_addr.clone()),
        "link.reply_timeout" => Some(format!("{}s", config.link.reply_timeout.as_secs())),
        "session.max_transfer_size" => Some(config.session.max_transfer_size.to_string()),
        "session.buffer_policy" => Some(
            match config.session.buffer_policy {
                BufferPolicy::Retain => "retain",
                BufferPolicy::Release => "release",
            }
            .to_string(),
        ),
        "session.idle_timeout" => Some(
            config
                .session
                .idle_timeout
                .map_or_else(|| "none".to_string(), |d| format!("{}s", d.as_secs())),
        ),
        "sender.max_retries" => Some(config.sender.max_retries.to_string()),
        "report.print_report" => Some(config.report.print_report.to_string()),
        _ => None,
    }
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<bool> {
    match key {
        "link.chunk_size" => {
            config.link.chunk_size = value.parse()?;
            Ok(true)
        }
        "link.listen_addr" => {
            config.link.listen_addr = value.to_string();
            Ok(true)
        }
        "link.reply_timeout" => {
            config.link.reply_timeout = parse_duration(value)?;
            Ok(true)
        }
        "session.max_transfer_size" => {
            config.session.max_transfer_size = value.parse()?;
            Ok(true)
        }
        "session.buffer_policy" => {
            config.session.buffer_policy = match value {
                "retain" => BufferPolicy::Retain,
                "release" => BufferPolicy::Release,
                other => anyhow::bail!("buffer_policy must be retain or release, got {other}"),
            };
            Ok(true)
        }
        "session.idle_timeout" => {
            config.session.idle_timeout = match value {
                "none" | "" => None,
                v => Some(parse_duration(v)?),
            };
            Ok(true)
        }
        "sender.max_retries" => {
            config.sender.max_retries = value.parse()?;
            Ok(true)
        }
        "report.print_report" => {
            config.report.print_report = value.parse()?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn parse_duration(value: &str) -> Result<std::time::Duration> {
    config::parse_duration(value).ok_or_else(|| anyhow::anyhow!("Invalid duration: {value}"))
}
