//! Line-oriented command parser.

use super::Command;

/// Parse an assembled payload into commands, one per non-empty line.
///
/// The parser never fails: a token that is not a finite decimal number ends
/// the parameter list for its line and anything after it is dropped. Invalid
/// UTF-8 is replaced rather than rejected.
pub fn parse_commands(payload: &[u8]) -> Vec<Command> {
    let text = String::from_utf8_lossy(payload);
    text.split('\n').filter_map(parse_line).collect()
}

/// Parse a single line. Returns `None` for blank lines.
pub fn parse_line(line: &str) -> Option<Command> {
    let mut tokens = line.split_ascii_whitespace();
    let name = tokens.next()?;

    let parameters = tokens.map_while(parse_number).collect();

    Some(Command::new(name, parameters))
}

/// `f64::from_str` also accepts `nan`, `inf` and `infinity`; those end the
/// parameter list like any other word.
fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}
