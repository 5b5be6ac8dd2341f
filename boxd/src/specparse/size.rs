//! Binary size-suffix parsing (§4.A, §9: "`k, kb, kib` all mean 1024 in
//! this system. This is intentional... it differs from SI convention.").

use boxd_shared::errors::{CoreError, CoreResult};

/// Parses a size string like `"512m"`, `"2GB"`, `"1024"` (bytes, no
/// suffix) into a byte count. `k`/`kb`/`kib` all mean 2^10, `m`/`mb`/`mib`
/// mean 2^20, and so on through `p`/`pb`/`pib` = 2^50.
pub fn parse_size(input: &str) -> CoreResult<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidArgument("size is empty".to_string()));
    }

    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split_at);

    if digits.is_empty() {
        return Err(CoreError::InvalidArgument(format!(
            "size '{input}' has no numeric component"
        )));
    }

    let value: u64 = digits
        .parse()
        .map_err(|_| CoreError::InvalidArgument(format!("size '{input}' is not a valid number")))?;

    let multiplier = match suffix.to_ascii_lowercase().as_str() {
        "" | "b" => 1u64,
        "k" | "kb" | "kib" => 1u64 << 10,
        "m" | "mb" | "mib" => 1u64 << 20,
        "g" | "gb" | "gib" => 1u64 << 30,
        "t" | "tb" | "tib" => 1u64 << 40,
        "p" | "pb" | "pib" => 1u64 << 50,
        other => {
            return Err(CoreError::InvalidArgument(format!(
                "unrecognized size suffix '{other}' in '{input}'"
            )));
        }
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| CoreError::InvalidArgument(format!("size '{input}' overflows")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_is_bytes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
    }

    #[test]
    fn binary_suffixes_are_binary_not_si() {
        assert_eq!(parse_size("1k").unwrap(), 1024);
        assert_eq!(parse_size("1kb").unwrap(), 1024);
        assert_eq!(parse_size("1KiB").unwrap(), 1024);
        assert_eq!(parse_size("1M").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("2g").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("1t").unwrap(), 1u64 << 40);
        assert_eq!(parse_size("1p").unwrap(), 1u64 << 50);
    }

    #[test]
    fn rejects_unknown_suffix() {
        assert!(parse_size("5xb").is_err());
    }

    #[test]
    fn rejects_empty_and_non_numeric() {
        assert!(parse_size("").is_err());
        assert!(parse_size("mb").is_err());
    }
}
