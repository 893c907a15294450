//! # Config 模块
//!
//! 播放节奏相关的配置项。所有时长均以毫秒为单位。
//!
//! 宿主可以从配置文件中反序列化 [`PlaybackConfig`]，缺失字段使用默认值。

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 播放配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// 文本区最多容纳的字符数，超出后清屏
    #[serde(default = "default_char_limit")]
    pub char_limit: usize,

    /// 打字机基础间隔（毫秒/字）
    #[serde(default = "default_typing_speed_ms")]
    pub typing_speed_ms: u64,

    /// 场景淡入淡出时长
    #[serde(default = "default_fade_duration_ms")]
    pub fade_duration_ms: u64,

    /// 场景淡入完成后遮罩层的透明度
    #[serde(default = "default_faded_in_opacity")]
    pub faded_in_opacity: f32,

    /// 背景交叉淡化时长
    #[serde(default = "default_background_transition_ms")]
    pub background_transition_ms: u64,

    /// 自动播放默认延迟
    #[serde(default = "default_auto_delay_ms")]
    pub default_auto_delay_ms: u64,

    /// 自动播放延迟下限
    #[serde(default = "default_min_auto_delay_ms")]
    pub min_auto_delay_ms: u64,

    /// 自动播放延迟上限
    #[serde(default = "default_max_auto_delay_ms")]
    pub max_auto_delay_ms: u64,

    /// 场景结束后切换到下一场景前的停顿
    #[serde(default = "default_scene_transition_delay_ms")]
    pub scene_transition_delay_ms: u64,

    /// 快进模式下两行之间的间隔
    #[serde(default = "default_skip_advance_delay_ms")]
    pub skip_advance_delay_ms: u64,

    /// 存档槽位数量
    #[serde(default = "default_max_save_slots")]
    pub max_save_slots: u32,
}

fn default_char_limit() -> usize {
    200
}

fn default_typing_speed_ms() -> u64 {
    15
}

fn default_fade_duration_ms() -> u64 {
    1000
}

fn default_faded_in_opacity() -> f32 {
    0.5
}

fn default_background_transition_ms() -> u64 {
    1000
}

fn default_auto_delay_ms() -> u64 {
    1500
}

fn default_min_auto_delay_ms() -> u64 {
    500
}

fn default_max_auto_delay_ms() -> u64 {
    5000
}

fn default_scene_transition_delay_ms() -> u64 {
    1500
}

fn default_skip_advance_delay_ms() -> u64 {
    50
}

fn default_max_save_slots() -> u32 {
    5
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            char_limit: default_char_limit(),
            typing_speed_ms: default_typing_speed_ms(),
            fade_duration_ms: default_fade_duration_ms(),
            faded_in_opacity: default_faded_in_opacity(),
            background_transition_ms: default_background_transition_ms(),
            default_auto_delay_ms: default_auto_delay_ms(),
            min_auto_delay_ms: default_min_auto_delay_ms(),
            max_auto_delay_ms: default_max_auto_delay_ms(),
            scene_transition_delay_ms: default_scene_transition_delay_ms(),
            skip_advance_delay_ms: default_skip_advance_delay_ms(),
            max_save_slots: default_max_save_slots(),
        }
    }
}

impl PlaybackConfig {
    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.char_limit == 0 {
            return Err(ConfigError::ValidationFailed(
                "char_limit 必须大于 0".to_string(),
            ));
        }

        if self.typing_speed_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "typing_speed_ms 必须大于 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.faded_in_opacity) {
            return Err(ConfigError::ValidationFailed(
                "faded_in_opacity 必须在 0.0 - 1.0 之间".to_string(),
            ));
        }

        if self.min_auto_delay_ms > self.max_auto_delay_ms {
            return Err(ConfigError::ValidationFailed(format!(
                "自动播放延迟范围无效: {} > {}",
                self.min_auto_delay_ms, self.max_auto_delay_ms
            )));
        }

        if !(self.min_auto_delay_ms..=self.max_auto_delay_ms).contains(&self.default_auto_delay_ms)
        {
            return Err(ConfigError::ValidationFailed(
                "default_auto_delay_ms 不在允许范围内".to_string(),
            ));
        }

        if self.max_save_slots == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_save_slots 必须大于 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 将自动播放延迟限制在允许范围内
    pub fn clamp_auto_delay(&self, delay_ms: u64) -> u64 {
        delay_ms.clamp(self.min_auto_delay_ms, self.max_auto_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlaybackConfig::default();
        assert_eq!(config.char_limit, 200);
        assert_eq!(config.typing_speed_ms, 15);
        assert_eq!(config.default_auto_delay_ms, 1500);
        assert_eq!(config.max_save_slots, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PlaybackConfig = serde_json::from_str(r#"{ "char_limit": 80 }"#).unwrap();
        assert_eq!(config.char_limit, 80);
        assert_eq!(config.fade_duration_ms, 1000);
    }

    #[test]
    fn test_config_validation() {
        let mut config = PlaybackConfig::default();

        config.faded_in_opacity = 1.5;
        assert!(config.validate().is_err());

        config.faded_in_opacity = 0.5;
        config.min_auto_delay_ms = 6000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamp_auto_delay() {
        let config = PlaybackConfig::default();
        assert_eq!(config.clamp_auto_delay(10), 500);
        assert_eq!(config.clamp_auto_delay(2000), 2000);
        assert_eq!(config.clamp_auto_delay(99_999), 5000);
    }
}
