//! §4.A Spec parser: pure, side-effect-free (aside from bind-mount source
//! existence checks), validated translations from external argument
//! strings into configuration records.

pub mod domain;
pub mod envfile;
pub mod mounts;
pub mod network_spec;
pub mod ports;
pub mod size;
pub mod volume_short;

pub use domain::validate_domain_name;
pub use envfile::parse_env_file;
pub use mounts::{Mount, MountType, parse_mount, validate_volume_name};
pub use network_spec::{NetworkAttachmentSpec, parse_network_spec};
pub use ports::{Proto, PublishedPort, parse_published_port, validate_no_overlap};
pub use size::parse_size;
pub use volume_short::parse_volume_short;
