//! # Event 模块
//!
//! 会话向宿主报告的事件。
//!
//! 宿主通过 `drain_events()` 取走事件，用于刷新界面和显示错误提示。
//! 可恢复的错误（场景跳过、资源加载失败）只通过事件报告，不中断播放。

use serde::{Deserialize, Serialize};

use crate::error::AssetKind;
use crate::script::ChapterKey;

/// 播放事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// 开始游戏
    SessionStarted,

    /// 进入新章节
    ChapterStarted { chapter: ChapterKey },

    /// 场景加载完成
    SceneStarted {
        chapter: ChapterKey,
        ordinal: usize,
        file: String,
    },

    /// 场景加载失败，已跳过
    SceneSkipped { file: String, reason: String },

    /// 一行对话显示完毕
    LineRevealed { text: String },

    /// 资源加载失败，已降级处理
    AssetFailed {
        kind: AssetKind,
        reference: String,
        reason: String,
    },

    /// 回到标题
    SessionEnded,

    /// 存档结果
    Saved { slot: u32, ok: bool },

    /// 读档结果
    Loaded { slot: u32, ok: bool },
}
