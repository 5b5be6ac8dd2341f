//! §4.C Entity store: one on-disk directory per entity id, a typed
//! `config.json` under each. `list` enumerates immediate subdirectories
//! that parse successfully; a directory that fails to parse is logged and
//! skipped rather than failing the whole listing.
//!
//! This replaces the teacher's `rusqlite`-backed `BoxStore` (see
//! `db::boxes`) but keeps its database-first discipline: every write lands
//! on disk, via a temp-file-then-rename, before the caller's in-memory
//! cache is allowed to observe it.

use boxd_shared::errors::{CoreError, CoreResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";

pub struct EntityStore<T> {
    root: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> EntityStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, _marker: PhantomData })
    }

    fn entity_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn config_path(&self, id: &str) -> PathBuf {
        self.entity_dir(id).join(CONFIG_FILE)
    }

    /// Fails `Exists` if `id` is already present.
    pub fn create(&self, id: &str, value: &T) -> CoreResult<()> {
        let dir = self.entity_dir(id);
        if dir.is_dir() {
            return Err(CoreError::Exists(format!("entity '{id}' already exists")));
        }
        std::fs::create_dir_all(&dir)?;
        write_config_atomically(&self.config_path(id), value)
    }

    /// Fails `NotFound` if `id` is absent.
    pub fn update(&self, id: &str, value: &T) -> CoreResult<()> {
        let dir = self.entity_dir(id);
        if !dir.is_dir() {
            return Err(CoreError::NotFound(format!("entity '{id}' does not exist")));
        }
        write_config_atomically(&self.config_path(id), value)
    }

    pub fn delete(&self, id: &str) -> CoreResult<()> {
        let dir = self.entity_dir(id);
        if !dir.is_dir() {
            return Err(CoreError::NotFound(format!("entity '{id}' does not exist")));
        }
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> CoreResult<T> {
        let path = self.config_path(id);
        let bytes = std::fs::read(&path).map_err(|_| {
            CoreError::NotFound(format!("entity '{id}' does not exist"))
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Enumerates all entities whose `config.json` decodes successfully.
    /// Entries that fail to decode are logged and skipped, not errored.
    pub fn list(&self) -> CoreResult<Vec<(String, T)>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.root)?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            match self.get(&id) {
                Ok(value) => out.push((id, value)),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "skipping entity with undecodable config");
                }
            }
        }
        Ok(out)
    }
}

fn write_config_atomically<T: Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn create_then_get_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store: EntityStore<Widget> = EntityStore::new(tmp.path()).unwrap();
        let w = Widget { name: "a".into(), count: 1 };
        store.create("a", &w).unwrap();
        assert_eq!(store.get("a").unwrap(), w);
    }

    #[test]
    fn create_twice_fails_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let store: EntityStore<Widget> = EntityStore::new(tmp.path()).unwrap();
        let w = Widget { name: "a".into(), count: 1 };
        store.create("a", &w).unwrap();
        let err = store.create("a", &w).unwrap_err();
        assert_eq!(err.kind_code(), "exists");
    }

    #[test]
    fn update_missing_fails_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store: EntityStore<Widget> = EntityStore::new(tmp.path()).unwrap();
        let w = Widget { name: "a".into(), count: 1 };
        let err = store.update("missing", &w).unwrap_err();
        assert_eq!(err.kind_code(), "not_found");
    }

    #[test]
    fn list_skips_undecodable_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let store: EntityStore<Widget> = EntityStore::new(tmp.path()).unwrap();
        let w = Widget { name: "good".into(), count: 1 };
        store.create("good", &w).unwrap();

        std::fs::create_dir_all(tmp.path().join("bad")).unwrap();
        std::fs::write(tmp.path().join("bad").join("config.json"), b"not json").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "good");
    }

    #[test]
    fn delete_removes_entity() {
        let tmp = tempfile::tempdir().unwrap();
        let store: EntityStore<Widget> = EntityStore::new(tmp.path()).unwrap();
        let w = Widget { name: "a".into(), count: 1 };
        store.create("a", &w).unwrap();
        store.delete("a").unwrap();
        assert!(store.get("a").is_err());
    }
}
