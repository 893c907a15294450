//! # Terminal 模块
//!
//! 终端宿主的协作者实现：
//!
//! - [`TerminalSurface`]：把渲染调用输出为文本
//! - [`FsImageLoader`]：用 `image` 读取图片头确认背景可用
//! - [`SilentAudio`]：只校验文件存在、不发声的音频后端

use std::io::{self, Stdout, Write};
use std::path::PathBuf;

use tracing::{debug, warn};
use vn_playback::{
    AssetError, AssetKind, AudioBackend, AudioClip, CharacterPosition, ImageLoader, RenderSurface,
    ShakeTier,
};

use crate::path::resolve;

/// 终端渲染表面
///
/// 对话文本逐字输出；背景、立绘、震屏等变化输出为方括号标注的状态行。
pub struct TerminalSurface<W: Write = Stdout> {
    out: W,
    /// 当前行是否已有文本
    line_open: bool,
    text_visible: bool,
}

impl TerminalSurface<Stdout> {
    /// 输出到标准输出
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSurface<W> {
    /// 输出到指定 writer
    pub fn new(out: W) -> Self {
        Self {
            out,
            line_open: false,
            text_visible: true,
        }
    }

    /// 底层 writer
    pub fn writer(&self) -> &W {
        &self.out
    }

    fn status(&mut self, message: &str) {
        let prefix = if self.line_open { "\n" } else { "" };
        self.line_open = false;
        if let Err(e) = writeln!(self.out, "{prefix}[{message}]") {
            warn!(error = %e, "终端输出失败");
        }
    }
}

impl<W: Write> RenderSurface for TerminalSurface<W> {
    fn set_background(&mut self, reference: &str) {
        self.status(&format!("背景 {reference}"));
    }

    fn clear_background(&mut self) {
        self.status("背景 清除");
    }

    fn show_overlay(&mut self, reference: &str) {
        self.status(&format!("背景切换中 → {reference}"));
    }

    fn animate_overlay_opacity(&mut self, opacity: f32, duration_ms: u64) {
        debug!(opacity, duration_ms, "背景叠加层渐变");
    }

    fn remove_overlay(&mut self) {}

    fn set_character(&mut self, portrait: Option<&str>, position: CharacterPosition) {
        match portrait {
            Some(portrait) => self.status(&format!("立绘 {portrait} @ {}", position.as_str())),
            None => self.status("立绘 隐藏"),
        }
    }

    fn begin_text_line(&mut self) {
        if self.line_open {
            if let Err(e) = writeln!(self.out) {
                warn!(error = %e, "终端输出失败");
            }
        }
        self.line_open = true;
    }

    fn append_text(&mut self, fragment: &str) {
        self.line_open = true;
        if let Err(e) = write!(self.out, "{fragment}") {
            warn!(error = %e, "终端输出失败");
        }
    }

    fn clear_text(&mut self) {
        self.status("清屏");
    }

    fn set_fade_opacity(&mut self, opacity: f32, duration_ms: u64) {
        debug!(opacity, duration_ms, "遮罩层渐变");
    }

    fn set_shake(&mut self, tier: Option<ShakeTier>) {
        if let Some(tier) = tier {
            self.status(&format!("震屏 {}", tier.class_name()));
        }
    }

    fn set_text_visible(&mut self, visible: bool) {
        if self.text_visible != visible {
            self.text_visible = visible;
            self.status(if visible { "文本框 显示" } else { "文本框 隐藏" });
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!(error = %e, "终端刷新失败");
        }
    }
}

/// 文件系统图片预加载
#[derive(Debug, Clone)]
pub struct FsImageLoader {
    root: PathBuf,
}

impl FsImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageLoader for FsImageLoader {
    fn preload(&mut self, reference: &str) -> Result<(), AssetError> {
        let path = resolve(&self.root, reference);
        let (width, height) =
            image::image_dimensions(&path).map_err(|e| AssetError::LoadFailed {
                kind: AssetKind::Image,
                path: reference.to_string(),
                message: e.to_string(),
            })?;
        debug!(reference, width, height, "背景预加载完成");
        Ok(())
    }
}

/// 静音音频后端
///
/// 不解码音频，每个片段报告固定的时长。
#[derive(Debug, Clone)]
pub struct SilentAudio {
    root: PathBuf,
    nominal_ms: u64,
}

impl SilentAudio {
    pub fn new(root: impl Into<PathBuf>, nominal_ms: u64) -> Self {
        Self {
            root: root.into(),
            nominal_ms,
        }
    }
}

impl AudioBackend for SilentAudio {
    fn load(&mut self, path: &str) -> Result<AudioClip, AssetError> {
        let full = resolve(&self.root, path);
        if !full.is_file() {
            return Err(AssetError::LoadFailed {
                kind: AssetKind::Audio,
                path: path.to_string(),
                message: "文件不存在".to_string(),
            });
        }
        Ok(AudioClip {
            path: path.to_string(),
            duration_ms: self.nominal_ms,
        })
    }

    fn play(&mut self, clip: &AudioClip, looping: bool) -> Result<(), AssetError> {
        debug!(path = %clip.path, looping, "播放音频（静音）");
        Ok(())
    }

    fn stop(&mut self) {
        debug!("停止音频");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn output(surface: &TerminalSurface<Vec<u8>>) -> String {
        String::from_utf8(surface.writer().clone()).unwrap()
    }

    #[test]
    fn test_surface_output() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.set_background("bg/room.png");
        surface.set_character(Some("ch/a.png"), CharacterPosition::Left);
        surface.begin_text_line();
        surface.append_text("你");
        surface.append_text("好");
        surface.begin_text_line();
        surface.append_text("再见");
        surface.set_shake(Some(ShakeTier::Light));
        surface.set_shake(None);
        surface.clear_text();

        assert_eq!(
            output(&surface),
            "[背景 bg/room.png]\n[立绘 ch/a.png @ left]\n你好\n再见\n[震屏 shake-1-25]\n[清屏]\n"
        );
    }

    #[test]
    fn test_text_visibility_reported_once() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.set_text_visible(true);
        surface.set_text_visible(false);
        surface.set_text_visible(false);
        assert_eq!(output(&surface), "[文本框 隐藏]\n");
    }

    #[test]
    fn test_image_loader() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bg")).unwrap();
        image::RgbImage::new(4, 3)
            .save(dir.path().join("bg/room.png"))
            .unwrap();
        fs::write(dir.path().join("bg/fake.png"), b"not an image").unwrap();

        let mut loader = FsImageLoader::new(dir.path());
        assert!(loader.preload("bg/room.png").is_ok());
        assert!(matches!(
            loader.preload("bg/fake.png"),
            Err(AssetError::LoadFailed {
                kind: AssetKind::Image,
                ..
            })
        ));
        assert!(loader.preload("bg/missing.png").is_err());
    }

    #[test]
    fn test_silent_audio() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("door.ogg"), b"").unwrap();

        let mut audio = SilentAudio::new(dir.path(), 1200);
        let clip = audio.load("door.ogg").unwrap();
        assert_eq!(clip.duration_ms, 1200);
        assert!(audio.play(&clip, false).is_ok());
        assert!(audio.load("bgm.ogg").is_err());
    }
}
