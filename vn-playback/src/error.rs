//! # Error 模块
//!
//! 定义 vn-playback 中使用的错误类型。
//!
//! 错误分类与恢复策略：
//!
//! - [`ContentError`]：场景索引或场景文件缺失/无法解析，由播放游标跳过场景恢复
//! - [`AssetError`]：背景图片或音频加载失败，降级处理后继续播放
//! - [`StorageError`]：存档读写失败，以 `false` 返回给调用方
//! - [`DirectiveError`]：场景文件中的单行指令不合法，在加载时拒绝整个场景

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 指令校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectiveError {
    /// 同一行设置了多个互斥的指令标签
    #[error("第 {line} 行：同时设置了互斥的指令 {tags:?}")]
    ConflictingTags { line: usize, tags: Vec<&'static str> },

    /// 字段不属于该指令
    #[error("第 {line} 行：字段 '{field}' 不能出现在 {tag} 指令中")]
    StrayField {
        line: usize,
        field: &'static str,
        tag: &'static str,
    },

    /// 无效的立绘位置
    #[error("第 {line} 行：无效的立绘位置 '{value}'")]
    InvalidPosition { line: usize, value: String },

    /// 无效的循环次数
    #[error("第 {line} 行：无效的循环次数 {value}（只允许 -1 或非负数）")]
    InvalidLoopCount { line: usize, value: i64 },
}

/// 内容错误（ContentMissing）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContentError {
    /// 场景索引不可用
    #[error("场景索引不可用: {message}")]
    IndexUnavailable { message: String },

    /// 场景索引为空
    #[error("场景索引为空，没有可播放的内容")]
    EmptyIndex,

    /// 场景文件不存在
    #[error("场景文件不存在: {file}")]
    SceneNotFound { file: String },

    /// 场景文件无法解析
    #[error("场景文件 {file} 解析失败: {message}")]
    SceneUnparseable { file: String, message: String },

    /// 场景文件中的指令不合法
    #[error("场景文件 {file} 指令无效: {source}")]
    InvalidDirective {
        file: String,
        #[source]
        source: DirectiveError,
    },
}

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// 背景图片
    Image,
    /// 音频
    Audio,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// 资源加载错误（AssetLoadFailure）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    /// 资源加载失败
    #[error("加载 {kind} 资源失败: {path} - {message}")]
    LoadFailed {
        kind: AssetKind,
        path: String,
        message: String,
    },

    /// 资源播放失败
    #[error("播放 {path} 失败: {message}")]
    PlaybackFailed { path: String, message: String },
}

impl AssetError {
    /// 出错的资源路径
    pub fn path(&self) -> &str {
        match self {
            Self::LoadFailed { path, .. } | Self::PlaybackFailed { path, .. } => path,
        }
    }
}

/// 持久化存储错误（StorageFailure）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// 读取失败
    #[error("读取 '{key}' 失败: {message}")]
    ReadFailed { key: String, message: String },

    /// 写入失败
    #[error("写入 '{key}' 失败: {message}")]
    WriteFailed { key: String, message: String },

    /// 删除失败
    #[error("删除 '{key}' 失败: {message}")]
    RemoveFailed { key: String, message: String },

    /// 序列化失败
    #[error("序列化失败: {0}")]
    Serialization(String),

    /// 存档版本不兼容
    #[error("存档版本不兼容: 存档版本 {found} vs 当前版本 {current}")]
    IncompatibleVersion { found: String, current: String },

    /// 槽位超出范围
    #[error("存档槽位 {slot} 超出范围 1..={max}")]
    SlotOutOfRange { slot: u32, max: u32 },
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 配置验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}

/// vn-playback 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VnError {
    /// 内容错误
    #[error("内容错误: {0}")]
    Content(#[from] ContentError),

    /// 资源错误
    #[error("资源错误: {0}")]
    Asset(#[from] AssetError),

    /// 存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// Result 类型别名
pub type VnResult<T> = Result<T, VnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: VnError = ContentError::EmptyIndex.into();
        assert!(matches!(err, VnError::Content(ContentError::EmptyIndex)));

        let err: VnError = StorageError::SlotOutOfRange { slot: 9, max: 5 }.into();
        assert!(err.to_string().contains("1..=5"));
    }

    #[test]
    fn test_invalid_directive_keeps_source() {
        use std::error::Error as _;

        let err = ContentError::InvalidDirective {
            file: "01_001.json".to_string(),
            source: DirectiveError::InvalidLoopCount { line: 3, value: -4 },
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("01_001.json"));
    }
}
