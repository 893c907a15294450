//! # Fade 模块
//!
//! 场景边界的遮罩淡入淡出。
//!
//! 遮罩不透明度 1.0 为全黑。场景第一句对话前淡入到半透明，场景结束时淡出到全黑。

use crate::config::PlaybackConfig;
use crate::stage::Stage;

/// 淡入，返回需要等待的时长
pub fn fade_in(stage: &mut Stage, config: &PlaybackConfig) -> u64 {
    stage.set_fade(config.faded_in_opacity, config.fade_duration_ms);
    config.fade_duration_ms
}

/// 淡出到全黑，返回需要等待的时长
pub fn fade_out(stage: &mut Stage, config: &PlaybackConfig) -> u64 {
    stage.set_fade(1.0, config.fade_duration_ms);
    config.fade_duration_ms
}

/// 淡出结束：清空文本
pub fn finish_fade_out(stage: &mut Stage) {
    stage.clear_text();
}

/// 立即设为全黑（场景初始化）
pub fn reset_opaque(stage: &mut Stage) {
    stage.set_fade(1.0, 0);
}
