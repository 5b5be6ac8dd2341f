//! Mount grammar (§4.A): comma-separated `key=val` directives.

use super::size::parse_size;
use boxd_shared::errors::{CoreError, CoreResult};
use boxd_shared::ids::anonymous_volume_name;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

fn volume_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,253}[A-Za-z0-9]$|^[A-Za-z0-9]$").unwrap()
    })
}

/// Validates a volume name against §8's boundary behaviors: rejects
/// `.`-prefixed/suffixed names and names over 255 chars; accepts anonymous
/// `anon-<26 char ULID>` names (which satisfy the same regex).
pub fn validate_volume_name(name: &str) -> CoreResult<()> {
    if name.is_empty() || name.len() > 255 {
        return Err(CoreError::InvalidArgument(format!(
            "volume name '{name}' must be 1..255 characters"
        )));
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err(CoreError::InvalidArgument(format!(
            "volume name '{name}' must not start or end with '.'"
        )));
    }
    if !volume_name_re().is_match(name) {
        return Err(CoreError::InvalidArgument(format!(
            "volume name '{name}' contains characters outside [A-Za-z0-9._-]"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountType {
    /// `bind` is accepted as an alias for `virtiofs`.
    Virtiofs,
    Tmpfs,
    Volume,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub mount_type: MountType,
    pub destination: String,
    pub read_only: bool,
    /// Populated for `Virtiofs`: the resolved, existing host directory.
    pub source_path: Option<PathBuf>,
    /// Populated for `Volume`: the volume name (generated if the directive
    /// didn't supply one).
    pub volume_name: Option<String>,
    /// `tmpfs`-only: byte size limit.
    pub size: Option<u64>,
    /// `tmpfs`-only: octal mode string as supplied.
    pub mode: Option<String>,
    pub options: HashMap<String, String>,
}

/// Parses one `type=...,source=...,destination=...[,readonly][,size=...]`
/// mount directive.
pub fn parse_mount(spec: &str) -> CoreResult<Mount> {
    let mut mount_type: Option<MountType> = None;
    let mut source: Option<String> = None;
    let mut destination: Option<String> = None;
    let mut read_only = false;
    let mut size: Option<u64> = None;
    let mut mode: Option<String> = None;
    let mut options = HashMap::new();

    for directive in spec.split(',') {
        let directive = directive.trim();
        if directive.is_empty() {
            continue;
        }
        match directive.split_once('=') {
            Some((key, val)) => match key {
                "type" => {
                    mount_type = Some(match val {
                        "bind" | "virtiofs" => MountType::Virtiofs,
                        "tmpfs" => MountType::Tmpfs,
                        "volume" => MountType::Volume,
                        other => {
                            return Err(CoreError::InvalidArgument(format!(
                                "unknown mount type '{other}'"
                            )));
                        }
                    });
                }
                "source" | "src" => source = Some(val.to_string()),
                "destination" | "dst" | "target" => destination = Some(val.to_string()),
                "size" => size = Some(parse_size(val)?),
                "mode" => mode = Some(val.to_string()),
                other => {
                    options.insert(other.to_string(), val.to_string());
                }
            },
            None => match directive {
                "readonly" | "ro" => read_only = true,
                other => {
                    return Err(CoreError::InvalidArgument(format!(
                        "mount directive '{other}' has no value"
                    )));
                }
            },
        }
    }

    let mount_type = mount_type
        .ok_or_else(|| CoreError::InvalidArgument(format!("mount '{spec}' is missing 'type'")))?;
    let destination = destination
        .ok_or_else(|| CoreError::InvalidArgument(format!("mount '{spec}' is missing 'destination'")))?;

    if (size.is_some() || mode.is_some()) && mount_type != MountType::Tmpfs {
        return Err(CoreError::InvalidArgument(
            "'size' and 'mode' are only valid for tmpfs mounts".to_string(),
        ));
    }

    match mount_type {
        MountType::Tmpfs => {
            if source.is_some() {
                return Err(CoreError::InvalidArgument(
                    "tmpfs mounts must not specify 'source'".to_string(),
                ));
            }
            Ok(Mount {
                mount_type,
                destination,
                read_only,
                source_path: None,
                volume_name: None,
                size,
                mode,
                options,
            })
        }
        MountType::Virtiofs => {
            let source = source.ok_or_else(|| {
                CoreError::InvalidArgument(format!("mount '{spec}' is missing 'source'"))
            })?;
            let path = resolve_filesystem_source(&source)?;
            Ok(Mount {
                mount_type,
                destination,
                read_only,
                source_path: Some(path),
                volume_name: None,
                size: None,
                mode: None,
                options,
            })
        }
        MountType::Volume => {
            let name = match source {
                Some(name) => {
                    validate_volume_name(&name)?;
                    name
                }
                None => anonymous_volume_name(),
            };
            Ok(Mount {
                mount_type,
                destination,
                read_only,
                source_path: None,
                volume_name: Some(name),
                size: None,
                mode: None,
                options,
            })
        }
    }
}

/// Public re-entry point for the volume-short-form parser, which needs the
/// same existence/directory checks for its `/abs/src:dst` form.
pub fn resolve_filesystem_source_pub(source: &str) -> CoreResult<PathBuf> {
    resolve_filesystem_source(source)
}

fn resolve_filesystem_source(source: &str) -> CoreResult<PathBuf> {
    let path = PathBuf::from(source);
    let path = if path.is_relative() {
        std::env::current_dir()
            .map_err(|e| CoreError::Internal(format!("cannot resolve cwd: {e}")))?
            .join(path)
    } else {
        path
    };
    if !path.exists() {
        return Err(CoreError::InvalidArgument(format!(
            "mount source '{}' does not exist",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(CoreError::InvalidArgument(format!(
            "mount source '{}' is not a directory",
            path.display()
        )));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmpfs_with_size() {
        let m = parse_mount("type=tmpfs,destination=/tmp,size=64m").unwrap();
        assert_eq!(m.mount_type, MountType::Tmpfs);
        assert_eq!(m.size, Some(64 * 1024 * 1024));
    }

    #[test]
    fn tmpfs_rejects_source() {
        let err = parse_mount("type=tmpfs,destination=/tmp,source=/foo").unwrap_err();
        assert!(err.to_string().contains("must not specify"));
    }

    #[test]
    fn size_only_valid_for_tmpfs() {
        let err = parse_mount("type=volume,source=data,destination=/data,size=1g").unwrap_err();
        assert!(err.to_string().contains("only valid for tmpfs"));
    }

    #[test]
    fn bind_is_alias_for_virtiofs() {
        let dir = tempfile::tempdir().unwrap();
        let spec = format!("type=bind,source={},destination=/data,ro", dir.path().display());
        let m = parse_mount(&spec).unwrap();
        assert_eq!(m.mount_type, MountType::Virtiofs);
        assert!(m.read_only);
    }

    #[test]
    fn virtiofs_source_must_exist() {
        let err = parse_mount("type=virtiofs,source=/no/such/dir,destination=/data").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn missing_volume_source_is_anonymous() {
        let m = parse_mount("type=volume,destination=/data").unwrap();
        assert!(m.volume_name.unwrap().starts_with("anon-"));
    }

    #[test]
    fn volume_name_rejects_dot_prefixed() {
        assert!(validate_volume_name(".hidden").is_err());
        assert!(validate_volume_name("trailing.").is_err());
        assert!(validate_volume_name(&"a".repeat(256)).is_err());
    }

    #[test]
    fn volume_name_accepts_anonymous_form() {
        let name = anonymous_volume_name();
        assert!(validate_volume_name(&name).is_ok());
    }

    #[test]
    fn volume_name_rejects_leading_underscore_or_dash() {
        assert!(validate_volume_name("_test").is_err());
        assert!(validate_volume_name("-test").is_err());
    }
}
