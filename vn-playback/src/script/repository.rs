//! # Repository 模块
//!
//! 脚本仓库抽象：将场景坐标解析为场景脚本。
//!
//! 具体的读取方式（文件系统、网络、内存）由宿主实现 [`ScriptRepository`]。
//! 本模块只提供内存实现 [`MemoryRepository`]，用于嵌入和测试。

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};

use super::directive::{LineDirective, SceneScript};
use super::index::{ChapterKey, SceneIndex};
use crate::error::ContentError;

/// 脚本仓库
///
/// 两个方法都可能失败（文件缺失、解析失败），由播放游标负责跳过恢复。
pub trait ScriptRepository {
    /// 读取场景索引
    fn scene_index(&self) -> Result<SceneIndex, ContentError>;

    /// 读取场景脚本
    fn scene_script(&self, file: &str) -> Result<SceneScript, ContentError>;
}

/// 内存中保存的场景
#[derive(Debug, Clone)]
enum StoredScene {
    /// 已构造的指令列表
    Parsed(Vec<LineDirective>),
    /// 场景文件原文，读取时解析
    Raw(String),
}

/// 内存脚本仓库
#[derive(Debug, Default)]
pub struct MemoryRepository {
    index: Option<BTreeMap<ChapterKey, Vec<String>>>,
    scenes: HashMap<String, StoredScene>,
    index_loads: Cell<usize>,
}

impl MemoryRepository {
    /// 创建空仓库（没有索引）
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置章节的场景文件列表
    pub fn with_chapter<I, S>(mut self, chapter: impl Into<ChapterKey>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index
            .get_or_insert_with(BTreeMap::new)
            .insert(chapter.into(), files.into_iter().map(Into::into).collect());
        self
    }

    /// 添加场景
    pub fn with_scene(mut self, file: impl Into<String>, lines: Vec<LineDirective>) -> Self {
        self.scenes.insert(file.into(), StoredScene::Parsed(lines));
        self
    }

    /// 添加场景文件原文
    pub fn with_scene_json(mut self, file: impl Into<String>, json: impl Into<String>) -> Self {
        self.scenes.insert(file.into(), StoredScene::Raw(json.into()));
        self
    }

    /// 场景索引被读取的次数
    pub fn index_loads(&self) -> usize {
        self.index_loads.get()
    }
}

impl ScriptRepository for MemoryRepository {
    fn scene_index(&self) -> Result<SceneIndex, ContentError> {
        self.index_loads.set(self.index_loads.get() + 1);
        let chapters = self
            .index
            .clone()
            .ok_or_else(|| ContentError::IndexUnavailable {
                message: "未设置场景索引".to_string(),
            })?;
        SceneIndex::new(chapters)
    }

    fn scene_script(&self, file: &str) -> Result<SceneScript, ContentError> {
        match self.scenes.get(file) {
            Some(StoredScene::Parsed(lines)) => Ok(SceneScript::new(file, lines.clone())),
            Some(StoredScene::Raw(json)) => SceneScript::parse(file, json),
            None => Err(ContentError::SceneNotFound {
                file: file.to_string(),
            }),
        }
    }
}
