//! Env-file grammar (§4.A, §8 scenario 6).

use boxd_shared::errors::{CoreError, CoreResult};
use std::collections::HashMap;

/// Parses env-file contents into an ordered list of `KEY=VALUE` strings.
///
/// - Lines are trimmed on the left only; empty lines and `#`-prefixed lines
///   are skipped.
/// - `KEY=VALUE` lines append verbatim (the value may itself contain `=`).
/// - A bare `KEY` line imports that key's value from `host_env` if present,
///   otherwise the line is dropped silently.
/// - Keys containing whitespace, or empty keys, are rejected.
pub fn parse_env_file(contents: &str, host_env: &HashMap<String, String>) -> CoreResult<Vec<String>> {
    let mut out = Vec::new();

    for raw_line in contents.lines() {
        let line = raw_line.trim_start();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) => {
                validate_key(key)?;
                out.push(format!("{key}={value}"));
            }
            None => {
                let key = line;
                validate_key(key)?;
                if let Some(value) = host_env.get(key) {
                    out.push(format!("{key}={value}"));
                }
            }
        }
    }

    Ok(out)
}

fn validate_key(key: &str) -> CoreResult<()> {
    if key.is_empty() {
        return Err(CoreError::InvalidArgument(
            "env file entry has an empty key".to_string(),
        ));
    }
    if key.chars().any(|c| c.is_whitespace()) {
        return Err(CoreError::InvalidArgument(format!(
            "env file key '{key}' contains whitespaces"
        )));
    }
    Ok(())
}
