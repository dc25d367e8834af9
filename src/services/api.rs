//! API request and response types for the HTTP intake.

use serde::{Deserialize, Serialize};

use crate::registry::LocoRecord;

// Re-export shared request types from messages module
pub use crate::messages::CommandRequest;

// ============================================================================
// Response Types
// ============================================================================

/// API response wrapper for consistent JSON structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present when success=true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present when success=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Gateway state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    /// Track power as last set by a throttle
    pub track_power: bool,
    /// Channel HTTP commands currently go to
    pub current_channel: char,
    /// Registered locos in registry order
    pub locos: Vec<LocoResponse>,
}

/// One registered loco
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocoResponse {
    /// DCC-style address
    pub address: u32,
    /// Whether the loco was added as a long address
    pub long_address: bool,
    /// Direction flag
    pub forward: bool,
    /// Speed, 0..=126
    pub speed: u8,
    /// Function bits, bit `n` is function `n`
    pub functions: u32,
}

impl From<&LocoRecord> for LocoResponse {
    fn from(loco: &LocoRecord) -> Self {
        Self {
            address: loco.address,
            long_address: loco.long_address,
            forward: loco.state.forward,
            speed: loco.state.speed,
            functions: loco.state.function_mask,
        }
    }
}
