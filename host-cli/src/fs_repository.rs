//! # FsRepository 模块
//!
//! 从资源目录读取场景索引和场景文件。
//!
//! ## 目录布局
//!
//! ```text
//! assets/
//! ├── scenes.json        # { "01": ["01_001.json", ...], ... }
//! ├── 01_001.json        # { "lines": [...] }
//! └── bg/ ch/ se/ ...
//! ```
//!
//! 场景文件标识是相对于资源根目录的逻辑路径。

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;
use vn_playback::{ContentError, SceneIndex, SceneScript, ScriptRepository};

use crate::path::resolve;

/// 文件系统脚本仓库
#[derive(Debug, Clone)]
pub struct FsRepository {
    root: PathBuf,
    index_file: String,
}

impl FsRepository {
    /// 创建仓库
    ///
    /// # 参数
    /// - `root`: 资源根目录
    /// - `index_file`: 场景索引文件（相对于 `root`）
    pub fn new(root: impl Into<PathBuf>, index_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_file: index_file.into(),
        }
    }

    /// 资源根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 场景文件是否存在
    pub fn scene_exists(&self, file: &str) -> bool {
        resolve(&self.root, file).is_file()
    }
}

impl ScriptRepository for FsRepository {
    fn scene_index(&self) -> Result<SceneIndex, ContentError> {
        let path = resolve(&self.root, &self.index_file);
        let content = fs::read_to_string(&path).map_err(|e| ContentError::IndexUnavailable {
            message: format!("{}: {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "读取场景索引");
        SceneIndex::parse(&content)
    }

    fn scene_script(&self, file: &str) -> Result<SceneScript, ContentError> {
        let path = resolve(&self.root, file);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ContentError::SceneNotFound {
                file: file.to_string(),
            },
            _ => ContentError::SceneUnparseable {
                file: file.to_string(),
                message: e.to_string(),
            },
        })?;
        SceneScript::parse(file, &content)
    }
}
