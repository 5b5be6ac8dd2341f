//! Domain-name grammar (§4.A).

use boxd_shared::errors::{CoreError, CoreResult};

/// Validates a dot-joined domain name: labels of 1..63 chars matching
/// `[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?`, total length ≤ 255, no
/// leading or trailing dot.
pub fn validate_domain_name(name: &str) -> CoreResult<()> {
    if name.is_empty() || name.len() > 255 {
        return Err(CoreError::InvalidArgument(format!(
            "domain name '{name}' must be 1..255 characters"
        )));
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err(CoreError::InvalidArgument(format!(
            "domain name '{name}' must not start or end with '.'"
        )));
    }

    for label in name.split('.') {
        validate_label(label, name)?;
    }
    Ok(())
}

fn validate_label(label: &str, full: &str) -> CoreResult<()> {
    if label.is_empty() || label.len() > 63 {
        return Err(CoreError::InvalidArgument(format!(
            "domain name '{full}' has an invalid label '{label}'"
        )));
    }
    let mut chars = label.chars();
    let first = chars.next().unwrap();
    let last = label.chars().last().unwrap();
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(CoreError::InvalidArgument(format!(
            "domain name '{full}' label '{label}' must start and end with alphanumerics"
        )));
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(CoreError::InvalidArgument(format!(
            "domain name '{full}' label '{label}' contains invalid characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_domain() {
        assert!(validate_domain_name("example.com").is_ok());
        assert!(validate_domain_name("a.b-c.example").is_ok());
    }

    #[test]
    fn rejects_leading_trailing_dot() {
        assert!(validate_domain_name(".example.com").is_err());
        assert!(validate_domain_name("example.com.").is_err());
    }

    #[test]
    fn rejects_label_starting_with_hyphen() {
        assert!(validate_domain_name("-bad.com").is_err());
    }

    #[test]
    fn rejects_over_length() {
        let long_label = "a".repeat(64);
        assert!(validate_domain_name(&long_label).is_err());
    }
}
