//! On-disk bundle directory layout for a single container (§4.F, §5 — the
//! bundle directory is the Containers service's shared resource; external
//! readers open files read-only).

use boxd_shared::errors::CoreResult;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BundleLayout {
    root: PathBuf,
}

impl BundleLayout {
    pub fn new(bundles_root: &Path, container_id: &str) -> Self {
        Self { root: bundles_root.join(container_id) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn kernel_metadata_path(&self) -> PathBuf {
        self.root.join("kernel.json")
    }

    pub fn create_options_path(&self) -> PathBuf {
        self.root.join("create_options.json")
    }

    pub fn rootfs_dir(&self) -> PathBuf {
        self.root.join("rootfs")
    }

    pub fn create(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.rootfs_dir())?;
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn cleanup(&self) -> CoreResult<()> {
        if self.root.is_dir() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_makes_root_and_rootfs_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = BundleLayout::new(tmp.path(), "c1");
        layout.create().unwrap();
        assert!(layout.root().is_dir());
        assert!(layout.rootfs_dir().is_dir());
    }

    #[test]
    fn cleanup_removes_entire_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = BundleLayout::new(tmp.path(), "c1");
        layout.create().unwrap();
        layout.cleanup().unwrap();
        assert!(!layout.exists());
    }
}
