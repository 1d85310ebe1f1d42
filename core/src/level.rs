// Security level — the single knob every service is tiered on

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Increasing protection: cipher strength, hop depth and relay routing.
///
/// Fixed for the lifetime of a service instance; build a new instance to
/// change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Stream cipher, direct transfers, direct submission
    Basic,
    /// AES-CBC, one intermediate hop, direct submission
    Standard,
    /// AES-GCM, multi-hop through the mixing pool, relay submission
    High,
}

impl SecurityLevel {
    pub const ALL: [SecurityLevel; 3] = [
        SecurityLevel::Basic,
        SecurityLevel::Standard,
        SecurityLevel::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityLevel::Basic => "basic",
            SecurityLevel::Standard => "standard",
            SecurityLevel::High => "high",
        }
    }

    /// Whether signed payloads go out through the relay router
    pub fn uses_relay(&self) -> bool {
        matches!(self, SecurityLevel::High)
    }
}

impl Default for SecurityLevel {
    fn default() -> Self {
        SecurityLevel::Standard
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown security level: {0} (expected basic, standard or high)")]
pub struct ParseSecurityLevelError(String);

impl FromStr for SecurityLevel {
    type Err = ParseSecurityLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(SecurityLevel::Basic),
            "standard" => Ok(SecurityLevel::Standard),
            "high" => Ok(SecurityLevel::High),
            other => Err(ParseSecurityLevelError(other.to_string())),
        }
    }
}
