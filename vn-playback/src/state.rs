//! # State 模块
//!
//! 播放游标：会话唯一的可变状态。
//!
//! ## 设计原则
//!
//! - 所有状态都放在一个显式的 [`PlaybackCursor`] 中，不存在隐式全局状态
//! - 只有调度循环和用户的模式切换会修改游标
//! - 回到标题时重置为默认值，读档时整体覆盖位置字段

use serde::{Deserialize, Serialize};

use crate::script::{ChapterKey, SceneCoordinate};

/// 播放阶段
///
/// ```text
/// Idle ─► SceneLoading ─► LineDispatch ─┬─► EffectRunning ──┐
///                ▲                      ├─► TypingRunning ──┤
///                │                      └─► SceneEnding     │
///                │                              │           │
///                └──── ChapterRollover ◄────────┘     LineDispatch
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackPhase {
    /// 未开始（标题画面）
    #[default]
    Idle,
    /// 正在加载场景
    SceneLoading,
    /// 等待或正在分发下一行
    LineDispatch,
    /// 等待效果结束
    EffectRunning,
    /// 逐字显示中
    TypingRunning,
    /// 场景结束淡出
    SceneEnding,
    /// 章节切换
    ChapterRollover,
}

/// 存档所需的最小游标字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    pub chapter: ChapterKey,
    pub scene_ordinal: usize,
    pub line_index: usize,
    pub char_count: usize,
    pub auto_advance_delay_ms: u64,
}

impl CursorSnapshot {
    /// 场景坐标
    pub fn coordinate(&self) -> SceneCoordinate {
        SceneCoordinate::new(self.chapter.clone(), self.scene_ordinal)
    }
}

/// 播放游标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackCursor {
    /// 当前章节（标题画面时为 None）
    pub chapter: Option<ChapterKey>,
    /// 章节内场景序号
    pub scene_ordinal: usize,
    /// 下一个要分发的行
    pub line_index: usize,
    /// 文本区已累计的字符数
    pub char_count: usize,
    /// 本场景还没有淡入过
    pub first_line_of_scene: bool,
    /// 重入保护
    pub busy: bool,
    pub auto_mode: bool,
    pub skip_mode: bool,
    pub hidden: bool,
    pub auto_advance_delay_ms: u64,
    /// 淡入/淡出进行中
    pub fading: bool,
    /// 场景切换等待中
    pub transitioning: bool,
    pub phase: PlaybackPhase,
}

impl PlaybackCursor {
    /// 创建游标
    pub fn new(auto_advance_delay_ms: u64) -> Self {
        Self {
            chapter: None,
            scene_ordinal: 0,
            line_index: 0,
            char_count: 0,
            first_line_of_scene: true,
            busy: false,
            auto_mode: false,
            skip_mode: false,
            hidden: false,
            auto_advance_delay_ms,
            fading: false,
            transitioning: false,
            phase: PlaybackPhase::Idle,
        }
    }

    /// 当前场景坐标
    pub fn coordinate(&self) -> Option<SceneCoordinate> {
        self.chapter
            .as_ref()
            .map(|chapter| SceneCoordinate::new(chapter.clone(), self.scene_ordinal))
    }

    /// 进入新场景
    pub fn begin_scene(&mut self) {
        self.line_index = 0;
        self.char_count = 0;
        self.first_line_of_scene = true;
    }

    /// 是否在标题画面
    pub fn is_idle(&self) -> bool {
        self.phase == PlaybackPhase::Idle
    }

    /// 累计一行文本的长度
    ///
    /// 加上这一行会超出 `limit` 时先清零，返回 `true` 表示需要清空文本区。
    pub fn accumulate_text(&mut self, len: usize, limit: usize) -> bool {
        let overflow = self.char_count + len > limit;
        if overflow {
            self.char_count = 0;
        }
        self.char_count += len;
        overflow
    }

    /// 关闭自动和快进模式
    pub fn clear_modes(&mut self) {
        self.auto_mode = false;
        self.skip_mode = false;
    }

    /// 存档用快照
    pub fn snapshot(&self) -> Option<CursorSnapshot> {
        Some(CursorSnapshot {
            chapter: self.chapter.clone()?,
            scene_ordinal: self.scene_ordinal,
            line_index: self.line_index,
            char_count: self.char_count,
            auto_advance_delay_ms: self.auto_advance_delay_ms,
        })
    }

    /// 用快照覆盖位置字段，并清除所有进行中的标志
    pub fn restore(&mut self, snapshot: &CursorSnapshot) {
        *self = Self {
            chapter: Some(snapshot.chapter.clone()),
            scene_ordinal: snapshot.scene_ordinal,
            line_index: snapshot.line_index,
            char_count: snapshot.char_count,
            first_line_of_scene: false,
            phase: PlaybackPhase::LineDispatch,
            ..Self::new(snapshot.auto_advance_delay_ms)
        };
    }
}
