//! # VN Playback
//!
//! 线性视觉小说的播放核心库。
//!
//! ## 架构概述
//!
//! `vn-playback` 是纯逻辑核心，不直接访问文件、终端或真实时钟。
//! 所有外部协作者都是 trait，由宿主提供实现：
//!
//! ```text
//! Host                                   Session
//!   │── Input (Progress / ToggleAuto …) ──►│
//!   │                                      │ dispatch → effect / typewriter
//!   │── advance_time(dt) ─────────────────►│ 触发到期定时器
//!   │◄── RenderSurface 调用 ───────────────│
//!   │◄── drain_events() ───────────────────│
//! ```
//!
//! ## 核心类型
//!
//! - [`Session`]：播放会话（游标 + 调度循环）
//! - [`Engine`]：把宿主输入转换为会话操作
//! - [`PlaybackCursor`]：可序列化的游标状态
//! - [`LineDirective`]：行指令
//! - [`PlaybackEvent`]：会话向宿主报告的事件
//!
//! ## 使用示例
//!
//! ```ignore
//! let session = Session::new(config, Collaborators { .. })?;
//! let mut engine = Engine::new(session);
//! engine.handle(Input::StartSession);
//!
//! loop {
//!     if let Some(input) = poll_input() {
//!         engine.handle(input);
//!     }
//!     engine.advance_time(elapsed_ms);
//!     for event in engine.drain_events() {
//!         host.show(event);
//!     }
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`script`]：行指令、场景索引、脚本仓库
//! - [`typewriter`]：逐字显示
//! - [`effects`]：背景、震屏、音频、遮罩
//! - [`stage`]：渲染表面和渲染状态镜像
//! - [`state`]：播放游标
//! - [`save`]：存档和偏好
//! - [`scheduler`]：虚拟时间定时器
//! - [`runtime`]：播放会话
//! - [`facade`]：引擎门面

pub mod config;
pub mod effects;
pub mod error;
pub mod event;
pub mod facade;
pub mod input;
pub mod runtime;
pub mod save;
pub mod scheduler;
pub mod script;
pub mod stage;
pub mod state;
pub mod typewriter;

// 重导出核心类型
pub use config::PlaybackConfig;
pub use effects::{
    AudioBackend, AudioClip, ImageLoader, MemoryAudio, MemoryImages, ShakeTier,
};
pub use error::{
    AssetError, AssetKind, ConfigError, ContentError, DirectiveError, StorageError, VnError,
    VnResult,
};
pub use event::PlaybackEvent;
pub use facade::{Engine, Overlay, SlotEntry};
pub use input::Input;
pub use runtime::{Collaborators, Session};
pub use save::{
    KeyValueStore, MemoryStore, RenderSummary, SaveSlot, SaveVersion, SlotSummary, SnapshotStore,
};
pub use scheduler::{Scheduler, TimerId};
pub use script::{
    CharacterPosition, LineDirective, MemoryRepository, PortraitChange, SceneCoordinate,
    SceneIndex, SceneScript, ScriptRepository,
};
pub use stage::{MemorySurface, RenderSurface, Stage};
pub use state::{CursorSnapshot, PlaybackCursor, PlaybackPhase};
pub use typewriter::{TypeStep, Typewriter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _line = LineDirective::dialogue("Hello");
        let _input = Input::Progress;
        let _cursor = PlaybackCursor::new(1500);
        let _config = PlaybackConfig::default();
    }
}
