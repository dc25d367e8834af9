//! Shared message types for HTTP command intake and peer forwarding.
//!
//! These types are `no_std` compatible and can be deserialized using either
//! `serde_json` (desktop) or `serde-json-core` (embedded).
//!
//! # Example
//!
//! ```
//! use ir_trainz::messages::CommandRequest;
//!
//! // Desktop: using serde_json
//! #[cfg(feature = "web")]
//! {
//!     let json = r#"{"channel": "B", "cmd": "speed", "args": "2"}"#;
//!     let req: CommandRequest = serde_json::from_str(json).unwrap();
//!     assert_eq!(req.cmd.as_str(), "speed");
//! }
//! ```

use heapless::String as HString;
use serde::{Deserialize, Serialize};

use crate::router::GatewayCommand;

/// Capacity of the `channel` field.
pub const MAX_CHANNEL_LEN: usize = 8;
/// Capacity of the `cmd` field.
pub const MAX_CMD_LEN: usize = 16;
/// Capacity of the `args` field.
pub const MAX_ARGS_LEN: usize = 32;

// ============================================================================
// Request Types
// ============================================================================

/// A command posted to `/api/cmd`, either by a client or by a peer gateway.
///
/// # JSON Examples
///
/// From a client:
/// ```json
/// {"channel": "A", "cmd": "sound", "args": "horn"}
/// ```
///
/// Forwarded by a peer:
/// ```json
/// {"channel": "A", "cmd": "sound", "args": "horn", "repeated": true}
/// ```
///
/// [`parse_command_request`] also accepts `repeated` as the string `"true"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Channel letter, empty to keep the current one
    #[serde(default)]
    pub channel: HString<MAX_CHANNEL_LEN>,
    /// Command name
    #[serde(default)]
    pub cmd: HString<MAX_CMD_LEN>,
    /// Command argument
    #[serde(default)]
    pub args: HString<MAX_ARGS_LEN>,
    /// Set on copies forwarded by a peer
    #[serde(default)]
    pub repeated: bool,
}

/// Same shape with `repeated` sent as a string.
#[cfg(feature = "serde-json-core")]
#[derive(Deserialize)]
struct TextRepeatedRequest {
    #[serde(default)]
    channel: HString<MAX_CHANNEL_LEN>,
    #[serde(default)]
    cmd: HString<MAX_CMD_LEN>,
    #[serde(default)]
    args: HString<MAX_ARGS_LEN>,
    repeated: HString<8>,
}

impl CommandRequest {
    /// Create a request, truncating fields that exceed their capacity.
    pub fn new(channel: &str, cmd: &str, args: &str) -> Self {
        Self {
            channel: truncated(channel),
            cmd: truncated(cmd),
            args: truncated(args),
            repeated: false,
        }
    }

    /// Builder: set the repeated flag.
    pub fn with_repeated(mut self, repeated: bool) -> Self {
        self.repeated = repeated;
        self
    }

    /// Convert into the router's command type.
    pub fn into_command(self) -> GatewayCommand {
        GatewayCommand::from(&self)
    }
}

impl From<&CommandRequest> for GatewayCommand {
    fn from(req: &CommandRequest) -> Self {
        GatewayCommand::new(req.channel.as_str(), req.cmd.as_str(), req.args.as_str())
            .with_repeated(req.repeated)
    }
}

impl From<&GatewayCommand> for CommandRequest {
    fn from(cmd: &GatewayCommand) -> Self {
        CommandRequest::new(&cmd.channel, &cmd.command, &cmd.args).with_repeated(cmd.repeated)
    }
}

fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = HString::new();
    let _ = out.push_str(&s[..end]);
    out
}

// ============================================================================
// Parsing Functions (using serde-json-core for no_std compatibility)
// ============================================================================

/// Parse a command request from JSON bytes.
///
/// Works in both `std` and `no_std` environments using `serde-json-core`.
/// Fields longer than their capacity make the request invalid.
///
/// # Example
///
/// ```
/// use ir_trainz::messages::parse_command_request;
///
/// let json = br#"{"channel": "G", "cmd": "light", "repeated": "true"}"#;
/// let req = parse_command_request(json).unwrap();
/// assert_eq!(req.channel.as_str(), "G");
/// assert_eq!(req.args.as_str(), "");
/// assert!(req.repeated);
/// ```
#[cfg(feature = "serde-json-core")]
pub fn parse_command_request(json: &[u8]) -> Option<CommandRequest> {
    // serde-json-core has no `deserialize_any`, so the string form gets its own pass
    if let Ok((req, _)) = serde_json_core::from_slice::<CommandRequest>(json) {
        return Some(req);
    }
    let (text, _) = serde_json_core::from_slice::<TextRepeatedRequest>(json).ok()?;
    Some(CommandRequest {
        channel: text.channel,
        cmd: text.cmd,
        args: text.args,
        repeated: text.repeated.as_str() == "true",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_truncates_long_fields() {
        let long = "x".repeat(100);
        let req = CommandRequest::new("A", "speed", &long);
        assert_eq!(req.args.len(), MAX_ARGS_LEN);
        assert!(!req.repeated);
    }

    #[test]
    fn converts_to_gateway_command() {
        let cmd = CommandRequest::new("C", "sound", "horn")
            .with_repeated(true)
            .into_command();
        assert_eq!(cmd, GatewayCommand::new("C", "sound", "horn").with_repeated(true));
    }

    #[test]
    fn converts_from_gateway_command() {
        let cmd = GatewayCommand::new("", "stop", "").forwarded();
        let req = CommandRequest::from(&cmd);
        assert_eq!(req.cmd.as_str(), "stop");
        assert!(req.repeated);
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn parse_full_request() {
        let req =
            parse_command_request(br#"{"channel":"B","cmd":"speed","args":"-2","repeated":false}"#)
                .unwrap();
        assert_eq!(req, CommandRequest::new("B", "speed", "-2"));
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn parse_repeated_variants() {
        let yes = parse_command_request(br#"{"cmd":"stop","repeated":true}"#).unwrap();
        let text = parse_command_request(br#"{"cmd":"stop","repeated":"true"}"#).unwrap();
        let other = parse_command_request(br#"{"cmd":"stop","repeated":"yes"}"#).unwrap();
        let missing = parse_command_request(br#"{"cmd":"stop"}"#).unwrap();
        assert!(yes.repeated);
        assert!(text.repeated);
        assert!(!other.repeated);
        assert!(!missing.repeated);
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn parse_forwarded_body() {
        let body = br#"{"channel":"A","cmd":"light","args":"","repeated":true}"#;
        let req = parse_command_request(body).unwrap();
        assert_eq!(req, CommandRequest::new("A", "light", "").with_repeated(true));
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_command_request(b"cmd=stop").is_none());
        assert!(parse_command_request(b"").is_none());
    }

    #[cfg(feature = "web")]
    #[test]
    fn serialize_for_forwarding() {
        let req = CommandRequest::new("A", "light", "").with_repeated(true);
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"channel":"A","cmd":"light","args":"","repeated":true}"#
        );
    }
}
