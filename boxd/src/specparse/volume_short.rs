//! Volume short form (§4.A): `src:dst[:opts]`, `/abs/src:dst[:opts]`, or a
//! bare `dst` (anonymous volume).

use super::mounts::{Mount, MountType, resolve_filesystem_source_pub, validate_volume_name};
use boxd_shared::errors::CoreResult;
use boxd_shared::ids::anonymous_volume_name;
use std::collections::HashMap;

/// Parses the volume short form into the same [`Mount`] shape `type=volume`
/// and `type=bind` directives produce.
pub fn parse_volume_short(spec: &str) -> CoreResult<Mount> {
    let parts: Vec<&str> = spec.splitn(3, ':').collect();

    let (source, destination, opts) = match parts.len() {
        1 => (None, parts[0].to_string(), ""),
        2 => (Some(parts[0].to_string()), parts[1].to_string(), ""),
        3 => (Some(parts[0].to_string()), parts[1].to_string(), parts[2]),
        _ => unreachable!("splitn(3, ..) never yields more than 3 parts"),
    };

    let read_only = opts.split(',').any(|o| o == "ro" || o == "readonly");

    match source {
        None => Ok(Mount {
            mount_type: MountType::Volume,
            destination,
            read_only,
            source_path: None,
            volume_name: Some(anonymous_volume_name()),
            size: None,
            mode: None,
            options: HashMap::new(),
        }),
        Some(src) if src.starts_with('/') => {
            let path = resolve_filesystem_source_pub(&src)?;
            Ok(Mount {
                mount_type: MountType::Virtiofs,
                destination,
                read_only,
                source_path: Some(path),
                volume_name: None,
                size: None,
                mode: None,
                options: HashMap::new(),
            })
        }
        Some(name) => {
            validate_volume_name(&name)?;
            Ok(Mount {
                mount_type: MountType::Volume,
                destination,
                read_only,
                source_path: None,
                volume_name: Some(name),
                size: None,
                mode: None,
                options: HashMap::new(),
            })
        }
    }
}
