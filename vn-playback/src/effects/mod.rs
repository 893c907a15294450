//! # Effects 模块
//!
//! 单个可等待的视听效果。
//!
//! 效果本身不计时：开始效果时返回需要等待的时长，由会话排入定时器，
//! 到期后再调用对应的结束函数。
//!
//! - [`background`]：背景交叉淡化
//! - [`shake`]：震屏
//! - [`audio`]：音频提示
//! - [`fade`]：场景边界遮罩

pub mod audio;
pub mod background;
pub mod fade;
pub mod shake;

pub use audio::{AudioBackend, AudioClip, AudioCuePlayer, CueProgress, MemoryAudio};
pub use background::{BackgroundTransitioner, ImageLoader, MemoryImages, Transition};
pub use shake::ShakeTier;
