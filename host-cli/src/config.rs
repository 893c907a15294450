//! # Config 模块
//!
//! 宿主配置：资源目录、存档目录，以及嵌套的播放配置。
//!
//! ## 配置文件格式
//!
//! ```json
//! {
//!   "assets_root": "assets",
//!   "scene_index": "scenes.json",
//!   "saves_dir": "saves",
//!   "nominal_cue_ms": 2000,
//!   "playback": { "typing_speed_ms": 20 }
//! }
//! ```
//!
//! 所有字段都可省略，缺失时使用默认值。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use vn_playback::PlaybackConfig;

/// 宿主配置错误
#[derive(Error, Debug)]
pub enum AppConfigError {
    #[error("资源目录不存在: {0:?}")]
    AssetsRootMissing(PathBuf),

    #[error("配置验证失败: {0}")]
    Playback(#[from] vn_playback::ConfigError),

    #[error("序列化配置失败: {0}")]
    SerializationFailed(String),

    #[error("写入配置失败: {0}")]
    IoError(String),
}

/// 宿主配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 资源根目录
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,

    /// 场景索引文件（相对于 assets_root）
    #[serde(default = "default_scene_index")]
    pub scene_index: String,

    /// 存档目录
    #[serde(default = "default_saves_dir")]
    pub saves_dir: PathBuf,

    /// 静音音频后端报告的单次播放时长
    #[serde(default = "default_nominal_cue_ms")]
    pub nominal_cue_ms: u64,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("assets")
}

fn default_scene_index() -> String {
    "scenes.json".to_string()
}

fn default_saves_dir() -> PathBuf {
    PathBuf::from("saves")
}

fn default_nominal_cue_ms() -> u64 {
    2000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assets_root: default_assets_root(),
            scene_index: default_scene_index(),
            saves_dir: default_saves_dir(),
            nominal_cue_ms: default_nominal_cue_ms(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    ///
    /// 文件不存在或无法解析时使用默认配置。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = ?path, "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = ?path, "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AppConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppConfigError::SerializationFailed(e.to_string()))?;
        fs::write(path, json).map_err(|e| AppConfigError::IoError(e.to_string()))
    }

    /// 场景索引的完整路径
    pub fn scene_index_path(&self) -> PathBuf {
        crate::path::resolve(&self.assets_root, &self.scene_index)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), AppConfigError> {
        if !self.assets_root.is_dir() {
            return Err(AppConfigError::AssetsRootMissing(self.assets_root.clone()));
        }
        self.playback.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scene_index, "scenes.json");
        assert_eq!(config.scene_index_path(), PathBuf::from("assets/scenes.json"));
        assert_eq!(config.playback, PlaybackConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "saves_dir": "s", "playback": { "char_limit": 10 } }"#)
                .unwrap();
        assert_eq!(config.saves_dir, PathBuf::from("s"));
        assert_eq!(config.playback.char_limit, 10);
        assert_eq!(config.playback.typing_speed_ms, 15);
        assert_eq!(config.nominal_cue_ms, 2000);
    }

    #[test]
    fn test_load_fallback_and_roundtrip() {
        let dir = tempfile::tempdir().unwrap();

        let missing = AppConfig::load(dir.path().join("nope.json"));
        assert_eq!(missing, AppConfig::default());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert_eq!(AppConfig::load(&broken), AppConfig::default());

        let mut config = AppConfig::default();
        config.assets_root = dir.path().to_path_buf();
        config.nominal_cue_ms = 10;
        let path = dir.path().join("config.json");
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path), config);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig {
            assets_root: dir.path().join("missing"),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AppConfigError::AssetsRootMissing(_))
        ));

        config.assets_root = dir.path().to_path_buf();
        config.playback.char_limit = 0;
        assert!(matches!(config.validate(), Err(AppConfigError::Playback(_))));
    }
}
