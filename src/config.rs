//! Configuration for ELF decoding.
//!
//! Defaults are suitable for untrusted input; callers can load overrides
//! from JSON.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default upper bound on a single NUL-terminated string scan (64KB).
pub const DEFAULT_MAX_STRING_LEN: usize = 64 * 1024;

/// Default maximum size of a file that may be memory-mapped (1GB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElfConfig {
    /// Longest string the resolver scans before reporting it unterminated.
    pub max_string_len: usize,
    /// Reject files whose `EI_VERSION` is not `EV_CURRENT`.
    pub strict_version: bool,
    /// Limits applied when opening memory-mapped sources.
    pub io: IoLimits,
}

impl Default for ElfConfig {
    fn default() -> Self {
        Self {
            max_string_len: DEFAULT_MAX_STRING_LEN,
            strict_version: false,
            io: IoLimits::default(),
        }
    }
}

impl ElfConfig {
    /// Parse a configuration from JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Defines the resource limits for mapped sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoLimits {
    /// The absolute maximum file size that can be opened.
    pub max_file_size: u64,
}

impl Default for IoLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ElfError;

    #[test]
    fn test_default_config() {
        let config = ElfConfig::default();
        assert_eq!(config.max_string_len, 64 * 1024);
        assert!(!config.strict_version);
        assert_eq!(config.io.max_file_size, 1024 * 1024 * 1024);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ElfConfig::from_json(r#"{ "strict_version": true }"#).unwrap();
        assert!(config.strict_version);
        assert_eq!(config.max_string_len, DEFAULT_MAX_STRING_LEN);

        let config = ElfConfig::from_json(r#"{ "io": { "max_file_size": 4096 } }"#).unwrap();
        assert_eq!(config.io.max_file_size, 4096);
        assert!(!config.strict_version);
    }

    #[test]
    fn test_json_round_trip() {
        let config = ElfConfig {
            max_string_len: 256,
            strict_version: true,
            io: IoLimits { max_file_size: 1 },
        };
        let json = config.to_json().unwrap();
        assert_eq!(ElfConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_json() {
        let result = ElfConfig::from_json(r#"{ "max_string_len": "lots" }"#);
        assert!(matches!(result, Err(ElfError::InvalidConfig(_))));
    }
}
