//! # Index 模块
//!
//! 章节 → 场景文件的扁平索引。
//!
//! 章节按键的字典序排列，决定播放顺序；每个章节内的场景文件按列表顺序播放。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::ContentError;

/// 章节键（可排序的不透明字符串）
pub type ChapterKey = String;

/// 场景坐标：章节 + 场景序号
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneCoordinate {
    /// 章节键
    pub chapter: ChapterKey,
    /// 章节内场景序号（从 0 开始）
    pub ordinal: usize,
}

impl SceneCoordinate {
    /// 创建场景坐标
    pub fn new(chapter: impl Into<ChapterKey>, ordinal: usize) -> Self {
        Self {
            chapter: chapter.into(),
            ordinal,
        }
    }
}

/// 场景索引
///
/// 加载后不可变。空索引不合法。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneIndex {
    chapters: BTreeMap<ChapterKey, Vec<String>>,
}

impl SceneIndex {
    /// 从章节映射创建索引
    pub fn new(chapters: BTreeMap<ChapterKey, Vec<String>>) -> Result<Self, ContentError> {
        if chapters.is_empty() {
            return Err(ContentError::EmptyIndex);
        }
        Ok(Self { chapters })
    }

    /// 从索引文件 JSON 解析
    pub fn parse(json: &str) -> Result<Self, ContentError> {
        let chapters: BTreeMap<ChapterKey, Vec<String>> =
            serde_json::from_str(json).map_err(|e| ContentError::IndexUnavailable {
                message: e.to_string(),
            })?;
        Self::new(chapters)
    }

    /// 第一个章节
    pub fn first_chapter(&self) -> &str {
        // new() 保证非空
        self.chapters.keys().next().map(String::as_str).unwrap_or_default()
    }

    /// 排在 `current` 之后的下一个章节
    ///
    /// `current` 不必存在于索引中（例如读档时章节已被移除）。
    pub fn next_chapter(&self, current: &str) -> Option<&str> {
        self.chapters
            .range::<str, _>((Bound::Excluded(current), Bound::Unbounded))
            .next()
            .map(|(key, _)| key.as_str())
    }

    /// 查找坐标对应的场景文件
    pub fn scene_file(&self, coordinate: &SceneCoordinate) -> Option<&str> {
        self.chapters
            .get(&coordinate.chapter)
            .and_then(|files| files.get(coordinate.ordinal))
            .map(String::as_str)
    }

    /// 按播放顺序遍历章节
    pub fn chapters(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.chapters
            .iter()
            .map(|(key, files)| (key.as_str(), files.as_slice()))
    }

    /// 章节内场景数量
    pub fn scene_count(&self, chapter: &str) -> usize {
        self.chapters.get(chapter).map_or(0, Vec::len)
    }

    /// 章节数量
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    /// 索引是否为空（正常构造的索引恒为 false）
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SceneIndex {
        SceneIndex::parse(
            r#"{ "02": ["02_001.json"], "01": ["01_001.json", "01_002.json"], "10": [] }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_chapter_order_is_lexicographic() {
        let index = sample();
        let order: Vec<&str> = index.chapters().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["01", "02", "10"]);
        assert_eq!(index.first_chapter(), "01");
    }

    #[test]
    fn test_next_chapter() {
        let index = sample();
        assert_eq!(index.next_chapter("01"), Some("02"));
        assert_eq!(index.next_chapter("02"), Some("10"));
        assert_eq!(index.next_chapter("10"), None);
        // 不存在的章节按排序位置继续
        assert_eq!(index.next_chapter("015"), Some("02"));
    }

    #[test]
    fn test_scene_file_lookup() {
        let index = sample();
        assert_eq!(
            index.scene_file(&SceneCoordinate::new("01", 1)),
            Some("01_002.json")
        );
        assert_eq!(index.scene_file(&SceneCoordinate::new("01", 2)), None);
        assert_eq!(index.scene_file(&SceneCoordinate::new("99", 0)), None);
        assert_eq!(index.scene_count("01"), 2);
        assert_eq!(index.scene_count("10"), 0);
    }

    #[test]
    fn test_empty_index_is_error() {
        assert_eq!(SceneIndex::parse("{}"), Err(ContentError::EmptyIndex));
        assert!(matches!(
            SceneIndex::parse("[1, 2]"),
            Err(ContentError::IndexUnavailable { .. })
        ));
    }
}
