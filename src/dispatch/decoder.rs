//! Raw line to command decoding

use serde::Deserialize;
use serde_json::Value;

/// Handler name used for lines that cannot be decoded
pub const FALLBACK_HANDLER: &str = "nofunction";

/// One decoded `(handler name, argument)` pair
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub handler_name: String,
    pub argument: Value,
}

impl Command {
    pub fn new(handler_name: impl Into<String>, argument: Value) -> Self {
        Self {
            handler_name: handler_name.into(),
            argument,
        }
    }
}

/// Turns one raw message into an ordered list of commands
///
/// Implementations must be pure: no side effects, no shared state.
pub trait MessageDecoder: Send {
    fn decode(&self, raw: &str) -> Vec<Command>;
}

#[derive(Deserialize)]
struct WireCommand {
    cmd: String,
    #[serde(default)]
    arg: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireMessage {
    One(WireCommand),
    Many(Vec<WireCommand>),
}

/// JSON decoder
///
/// A line is either `{"cmd": name, "arg": value}` or an array of those.
/// Anything else becomes a single [`FALLBACK_HANDLER`] command carrying the
/// verbatim line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMessageDecoder;

impl MessageDecoder for JsonMessageDecoder {
    fn decode(&self, raw: &str) -> Vec<Command> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<WireMessage>(trimmed) {
            Ok(WireMessage::One(wire)) => vec![Command::new(wire.cmd, wire.arg)],
            Ok(WireMessage::Many(wires)) => wires
                .into_iter()
                .map(|wire| Command::new(wire.cmd, wire.arg))
                .collect(),
            Err(e) => {
                tracing::debug!("Undecodable message ({}): {}", e, raw);
                vec![Command::new(FALLBACK_HANDLER, Value::String(raw.to_string()))]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_command() {
        let commands = JsonMessageDecoder.decode(r#"{"cmd": "set_plot_title", "arg": "Rabi"}"#);
        assert_eq!(commands, vec![Command::new("set_plot_title", json!("Rabi"))]);
    }

    #[test]
    fn test_batch_preserves_order() {
        let commands = JsonMessageDecoder.decode(
            r#"[{"cmd": "clear_data", "arg": "all"},
                {"cmd": "generate_plot_pointbypoint", "arg": [1.0, [2.0]]},
                {"cmd": "clear_plot"}]"#,
        );
        let names: Vec<&str> = commands.iter().map(|c| c.handler_name.as_str()).collect();
        assert_eq!(names, vec!["clear_data", "generate_plot_pointbypoint", "clear_plot"]);
        assert_eq!(commands[2].argument, Value::Null);
    }

    #[test]
    fn test_garbage_goes_to_fallback() {
        let commands = JsonMessageDecoder.decode("hello instrument");
        assert_eq!(
            commands,
            vec![Command::new(FALLBACK_HANDLER, json!("hello instrument"))]
        );

        // Valid JSON without a command name is also undecodable
        let commands = JsonMessageDecoder.decode(r#"{"arg": 1}"#);
        assert_eq!(commands[0].handler_name, FALLBACK_HANDLER);
    }

    #[test]
    fn test_blank_line_is_empty() {
        assert!(JsonMessageDecoder.decode("   ").is_empty());
    }
}
