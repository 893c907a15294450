//! # FsStore 模块
//!
//! 文件系统键值存储，每个键对应存档目录下的一个文件。
//!
//! ## 文件布局
//!
//! ```text
//! saves/
//! ├── autoSpeed.json
//! ├── vnSave_1.json
//! └── ...
//! ```
//!
//! 写入先落到临时文件，再重命名覆盖目标文件。

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use vn_playback::{KeyValueStore, StorageError};

/// 文件系统键值存储
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// 创建存储
    ///
    /// 目录在第一次写入时创建。
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// 存储目录
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 键对应的文件路径
    ///
    /// 只允许字母、数字、`_` 和 `-`，其余字符替换为 `_`。
    pub fn key_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    fn ensure_dir(&self, key: &str) -> Result<(), StorageError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                message: format!("无法创建存档目录: {e}"),
            })?;
        }
        Ok(())
    }
}

impl KeyValueStore for FsStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_dir(key)?;

        let path = self.key_path(key);
        let temp = path.with_extension("json.tmp");
        let write_failed = |e: std::io::Error| StorageError::WriteFailed {
            key: key.to_string(),
            message: e.to_string(),
        };

        fs::write(&temp, value).map_err(write_failed)?;
        fs::rename(&temp, &path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            write_failed(e)
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFailed {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vn_playback::{PlaybackCursor, RenderSummary, SaveSlot, SnapshotStore};

    #[test]
    fn test_get_set_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::new(dir.path().join("saves"));

        assert_eq!(store.get("autoSpeed").unwrap(), None);
        store.set("autoSpeed", "2000").unwrap();
        assert_eq!(store.get("autoSpeed").unwrap().as_deref(), Some("2000"));
        assert!(store.key_path("autoSpeed").exists());

        store.set("autoSpeed", "900").unwrap();
        assert_eq!(store.get("autoSpeed").unwrap().as_deref(), Some("900"));

        store.remove("autoSpeed").unwrap();
        assert_eq!(store.get("autoSpeed").unwrap(), None);
        store.remove("autoSpeed").unwrap();
    }

    #[test]
    fn test_key_sanitized() {
        let store = FsStore::new("saves");
        assert_eq!(
            store.key_path("../vnSave 1"),
            PathBuf::from("saves/___vnSave_1.json")
        );
    }

    #[test]
    fn test_no_temp_file_left() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::new(dir.path());
        store.set("vnSave_1", "{}").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["vnSave_1.json".to_string()]);
    }

    #[test]
    fn test_snapshot_store_over_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshots = SnapshotStore::new(Box::new(FsStore::new(dir.path())), 5);

        let mut cursor = PlaybackCursor::new(1500);
        cursor.chapter = Some("01".to_string());
        cursor.line_index = 3;
        let snapshot = cursor.snapshot().unwrap();
        let slot = SaveSlot::new(snapshot, RenderSummary::default());

        assert!(snapshots.save(2, &slot));
        assert!(dir.path().join("vnSave_2.json").exists());
        let loaded = snapshots.load(2).unwrap();
        assert_eq!(loaded.cursor.line_index, 3);

        assert!(!snapshots.save(6, &slot));
        assert!(snapshots.delete(2));
        assert!(snapshots.load(2).is_none());
    }
}
