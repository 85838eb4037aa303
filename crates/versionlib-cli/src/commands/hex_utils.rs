//! Hex offset/address parsing and formatting utilities.

use anyhow::Result;

/// Parse a hex value (with or without 0x prefix).
///
/// Underscores are accepted as digit separators, so `0x1_4000_0000` parses.
pub fn parse_hex(s: &str) -> Result<u64> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .replace('_', "");
    u64::from_str_radix(&digits, 16)
        .map_err(|e| anyhow::anyhow!("Invalid hex value '{}': {}", s, e))
}

/// Format a value as a hex string with 0x prefix.
pub fn format_hex(value: u64) -> String {
    format!("0x{:X}", value)
}
