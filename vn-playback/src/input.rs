//! # Input 模块
//!
//! 宿主向引擎传递的语义化输入。
//!
//! ## 设计说明
//!
//! - 引擎不直接处理鼠标/键盘事件，宿主把点击和回车统一转换为 [`Input::Progress`]
//! - 其余输入是离散的命令（模式切换、菜单开关、存读档）
//! - 时间流逝不是输入，由宿主调用 `advance_time` 推进

use serde::{Deserialize, Serialize};

/// 宿主输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Input {
    /// 从标题画面开始游戏
    StartSession,
    /// 推进（点击或回车）
    Progress,
    ToggleAuto,
    ToggleSkip,
    ToggleHidden,
    OpenSave,
    CloseSave,
    OpenLoad,
    CloseLoad,
    OpenSettings,
    CloseSettings,
    /// 保存到槽位（1-based）
    SaveToSlot(u32),
    /// 从槽位读取（1-based）
    LoadFromSlot(u32),
    /// 删除槽位
    DeleteSlot(u32),
    /// 调整自动播放间隔
    AdjustAutoSpeed(u64),
    /// 回到标题画面
    ExitToMenu,
}

impl Input {
    /// 创建推进输入
    pub fn progress() -> Self {
        Self::Progress
    }

    /// 是否是推进输入
    pub fn is_progress(&self) -> bool {
        matches!(self, Self::Progress)
    }
}
