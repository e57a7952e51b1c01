use std::env;

use super::types::ConfigError;
use crate::models::SyncMode;

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

pub(super) fn parse_u8(field: &'static str, value: String) -> Result<u8, ConfigError> {
    value.parse::<u8>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_usize(field: &'static str, value: String) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

pub(super) fn parse_sync_mode(value: Option<String>) -> Result<SyncMode, ConfigError> {
    match value.as_deref().map(|item| item.to_ascii_lowercase()) {
        None => Ok(SyncMode::Coordinated),
        Some(ref val) if val == "coordinated" || val == "synchronized" => {
            Ok(SyncMode::Coordinated)
        }
        Some(ref val) if val == "unguarded" || val == "unsynchronized" => Ok(SyncMode::Unguarded),
        Some(val) => Err(ConfigError::InvalidValue { field: "MARKING_SYNC_MODE", value: val }),
    }
}
