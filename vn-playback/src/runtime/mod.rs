//! # Runtime 模块
//!
//! 播放会话：游标 + 调度循环 + 所有协作者。
//!
//! ## 模块结构
//!
//! - [`session`]：会话对象和对外操作
//! - [`dispatch`]：行分发、效果续接、场景切换

pub mod dispatch;
pub mod session;

pub use session::{Collaborators, Session};

/// 定时任务
///
/// 每个可等待的效果结束时都以一个任务的形式回到调度循环。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Task {
    /// 打字机下一步
    TypeStep,
    /// 背景交叉淡化结束
    BackgroundDone,
    /// 场景首句淡入结束
    FadeInDone,
    /// 震屏结束
    ShakeDone,
    /// 音频一遍播放结束
    CueEnded,
    /// 场景结束淡出完成
    FadeOutDone,
    /// 场景切换等待结束
    SceneTransition,
    /// 自动模式推进
    AutoAdvance,
    /// 快进模式推进
    SkipAdvance,
}
