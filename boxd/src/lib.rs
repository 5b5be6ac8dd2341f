//! Host-side control plane for container instances running on a
//! lightweight virtualization layer: parses declarative specs into typed
//! configs, allocates container-to-host-network attachments, and drives
//! the containers/networks/content-store lifecycle described in
//! `boxd::runtime::Platform`.

pub mod containers;
pub mod content;
pub mod entitystore;
pub mod lockmap;
pub mod logging;
pub mod network;
pub mod progress;
pub mod runtime;
pub mod specparse;
pub mod supervisor;
pub mod util;
pub mod volumes;

pub use runtime::{default_paths, Platform, PlatformPaths};
