//! Network attachment spec (§4.A): `name[,mac=<mac>]`.

use boxd_shared::errors::{CoreError, CoreResult};
use regex::Regex;
use std::sync::OnceLock;

fn mac_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").unwrap()
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAttachmentSpec {
    pub network_name: String,
    pub mac: Option<String>,
}

pub fn parse_network_spec(spec: &str) -> CoreResult<NetworkAttachmentSpec> {
    let mut parts = spec.split(',');
    let network_name = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::InvalidArgument(format!("network spec '{spec}' has no name")))?
        .to_string();

    let mut mac = None;
    for prop in parts {
        if prop.is_empty() {
            return Err(CoreError::InvalidArgument(format!(
                "network spec '{spec}' has an empty property"
            )));
        }
        match prop.split_once('=') {
            Some(("mac", value)) => {
                if value.is_empty() {
                    return Err(CoreError::InvalidArgument(
                        "network spec 'mac' property has no value".to_string(),
                    ));
                }
                if !mac_re().is_match(value) {
                    return Err(CoreError::InvalidArgument(format!(
                        "'{value}' is not a valid MAC address"
                    )));
                }
                mac = Some(value.to_string());
            }
            _ => {
                return Err(CoreError::InvalidArgument(format!(
                    "network spec '{spec}' has an unknown property '{prop}'"
                )));
            }
        }
    }

    Ok(NetworkAttachmentSpec { network_name, mac })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_only() {
        let s = parse_network_spec("default").unwrap();
        assert_eq!(s.network_name, "default");
        assert!(s.mac.is_none());
    }

    #[test]
    fn name_with_mac_colon_form() {
        let s = parse_network_spec("default,mac=02:42:ac:11:00:02").unwrap();
        assert_eq!(s.mac.as_deref(), Some("02:42:ac:11:00:02"));
    }

    #[test]
    fn name_with_mac_dash_form() {
        let s = parse_network_spec("default,mac=02-42-ac-11-00-02").unwrap();
        assert_eq!(s.mac.as_deref(), Some("02-42-ac-11-00-02"));
    }

    #[test]
    fn rejects_invalid_mac() {
        assert!(parse_network_spec("default,mac=zz").is_err());
    }

    #[test]
    fn rejects_unknown_property() {
        assert!(parse_network_spec("default,bogus=1").is_err());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(parse_network_spec("").is_err());
    }
}
