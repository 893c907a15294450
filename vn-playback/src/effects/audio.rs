//! # Audio 模块
//!
//! 音频提示播放：同一时间只播放一个音频。
//!
//! ## 循环次数
//!
//! - `-1`：无限循环，开始播放即视为完成
//! - `n >= 1`：依次播放 n 遍，最后一遍结束时完成
//! - `0`：停止当前音频，不播放
//!
//! 加载和播放失败只记录日志，不会阻塞播放流程。

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::error::{AssetError, AssetKind};

/// 已加载的音频
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// 资源路径
    pub path: String,
    /// 单遍时长
    pub duration_ms: u64,
}

/// 音频后端
pub trait AudioBackend {
    /// 加载音频
    fn load(&mut self, path: &str) -> Result<AudioClip, AssetError>;

    /// 从头播放（`looping = true` 时无限循环）
    fn play(&mut self, clip: &AudioClip, looping: bool) -> Result<(), AssetError>;

    /// 停止并回到开头
    fn stop(&mut self);
}

/// 开始播放后的状态
#[derive(Debug, Clone, PartialEq)]
pub enum CueProgress {
    /// 已完成（无限循环已开始、循环次数为 0）
    Resolved,
    /// 当前这一遍将在 `after_ms` 后结束，届时调用 [`AudioCuePlayer::repetition_ended`]
    Repeating { after_ms: u64 },
}

#[derive(Debug, Clone)]
struct ActiveCue {
    clip: AudioClip,
    remaining: u32,
}

/// 音频提示播放器
///
/// 加载过的音频按路径缓存，回到标题时清空。
pub struct AudioCuePlayer {
    backend: Box<dyn AudioBackend>,
    cache: HashMap<String, AudioClip>,
    current: Option<ActiveCue>,
    playing: bool,
}

impl AudioCuePlayer {
    /// 创建播放器
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            cache: HashMap::new(),
            current: None,
            playing: false,
        }
    }

    /// 播放音频
    ///
    /// 返回 `Err` 时调用方只需记录错误，播放流程视为已完成。
    pub fn play(&mut self, path: &str, loop_count: i64) -> Result<CueProgress, AssetError> {
        self.stop();

        if loop_count == 0 {
            return Ok(CueProgress::Resolved);
        }

        let clip = match self.cache.get(path) {
            Some(clip) => clip.clone(),
            None => {
                let clip = self.backend.load(path)?;
                self.cache.insert(path.to_string(), clip.clone());
                clip
            }
        };

        if loop_count < 0 {
            self.backend.play(&clip, true)?;
            self.playing = true;
            debug!(path = %path, "音频无限循环");
            return Ok(CueProgress::Resolved);
        }

        self.backend.play(&clip, false)?;
        self.playing = true;
        let after_ms = clip.duration_ms;
        debug!(path = %path, loop_count, "音频开始播放");
        self.current = Some(ActiveCue {
            clip,
            remaining: u32::try_from(loop_count - 1).unwrap_or(u32::MAX),
        });
        Ok(CueProgress::Repeating { after_ms })
    }

    /// 当前这一遍播放结束
    pub fn repetition_ended(&mut self) -> Result<CueProgress, AssetError> {
        let Some(cue) = self.current.as_mut() else {
            return Ok(CueProgress::Resolved);
        };

        if cue.remaining == 0 {
            self.current = None;
            self.playing = false;
            return Ok(CueProgress::Resolved);
        }

        cue.remaining -= 1;
        let clip = cue.clip.clone();
        if let Err(e) = self.backend.play(&clip, false) {
            self.current = None;
            self.playing = false;
            return Err(e);
        }
        Ok(CueProgress::Repeating {
            after_ms: clip.duration_ms,
        })
    }

    /// 停止当前音频（可重复调用）
    pub fn stop(&mut self) {
        if self.playing {
            self.backend.stop();
        }
        self.playing = false;
        self.current = None;
    }

    /// 是否有音频在播放
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// 停止播放并清空缓存
    pub fn cleanup(&mut self) {
        self.stop();
        self.cache.clear();
    }
}

/// 内存音频后端的状态
#[derive(Debug, Clone, Default)]
pub struct AudioLog {
    /// 调用记录
    pub calls: Vec<String>,
    /// 当前播放的音频
    pub now_playing: Option<String>,
}

/// 内存音频后端
///
/// 所有音频使用同一个时长，除非单独设置或标记缺失。
#[derive(Debug, Clone)]
pub struct MemoryAudio {
    default_duration_ms: u64,
    durations: HashMap<String, u64>,
    missing: HashSet<String>,
    log: Rc<RefCell<AudioLog>>,
}

impl MemoryAudio {
    /// 创建后端
    pub fn new(default_duration_ms: u64) -> Self {
        Self {
            default_duration_ms,
            durations: HashMap::new(),
            missing: HashSet::new(),
            log: Rc::default(),
        }
    }

    /// 设置音频时长
    pub fn with_clip(mut self, path: impl Into<String>, duration_ms: u64) -> Self {
        self.durations.insert(path.into(), duration_ms);
        self
    }

    /// 标记音频缺失
    pub fn with_missing(mut self, path: impl Into<String>) -> Self {
        self.missing.insert(path.into());
        self
    }

    /// 调用记录
    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().calls.clone()
    }

    /// 当前播放的音频
    pub fn now_playing(&self) -> Option<String> {
        self.log.borrow().now_playing.clone()
    }
}

impl AudioBackend for MemoryAudio {
    fn load(&mut self, path: &str) -> Result<AudioClip, AssetError> {
        self.log.borrow_mut().calls.push(format!("load:{path}"));
        if self.missing.contains(path) {
            return Err(AssetError::LoadFailed {
                kind: AssetKind::Audio,
                path: path.to_string(),
                message: "文件不存在".to_string(),
            });
        }
        Ok(AudioClip {
            path: path.to_string(),
            duration_ms: self
                .durations
                .get(path)
                .copied()
                .unwrap_or(self.default_duration_ms),
        })
    }

    fn play(&mut self, clip: &AudioClip, looping: bool) -> Result<(), AssetError> {
        let mut log = self.log.borrow_mut();
        let verb = if looping { "loop" } else { "play" };
        log.calls.push(format!("{verb}:{}", clip.path));
        log.now_playing = Some(clip.path.clone());
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = self.log.borrow_mut();
        log.calls.push("stop".to_string());
        log.now_playing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(backend: &MemoryAudio) -> AudioCuePlayer {
        AudioCuePlayer::new(Box::new(backend.clone()))
    }

    #[test]
    fn test_infinite_loop_resolves_on_start() {
        let backend = MemoryAudio::new(2000);
        let mut player = player(&backend);
        assert_eq!(player.play("bgm.ogg", -1), Ok(CueProgress::Resolved));
        assert_eq!(backend.now_playing().as_deref(), Some("bgm.ogg"));
        assert_eq!(backend.calls(), vec!["load:bgm.ogg", "loop:bgm.ogg"]);
    }

    #[test]
    fn test_repetitions() {
        let backend = MemoryAudio::new(300);
        let mut player = player(&backend);

        assert_eq!(
            player.play("se.wav", 2),
            Ok(CueProgress::Repeating { after_ms: 300 })
        );
        assert_eq!(
            player.repetition_ended(),
            Ok(CueProgress::Repeating { after_ms: 300 })
        );
        assert_eq!(player.repetition_ended(), Ok(CueProgress::Resolved));
        assert!(!player.is_playing());
        assert_eq!(
            backend.calls(),
            vec!["load:se.wav", "play:se.wav", "play:se.wav"]
        );
    }

    #[test]
    fn test_huge_loop_count_keeps_repeating() {
        let backend = MemoryAudio::new(300);
        let mut player = player(&backend);

        let loops = i64::from(u32::MAX) + 10;
        assert_eq!(
            player.play("se.wav", loops),
            Ok(CueProgress::Repeating { after_ms: 300 })
        );
        for _ in 0..3 {
            assert_eq!(
                player.repetition_ended(),
                Ok(CueProgress::Repeating { after_ms: 300 })
            );
        }
        assert!(player.is_playing());
    }

    #[test]
    fn test_cache_and_single_cue() {
        let backend = MemoryAudio::new(100);
        let mut player = player(&backend);

        player.play("a.ogg", -1).unwrap();
        player.play("b.ogg", -1).unwrap();
        player.play("a.ogg", -1).unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                "load:a.ogg",
                "loop:a.ogg",
                "stop",
                "load:b.ogg",
                "loop:b.ogg",
                "stop",
                "loop:a.ogg"
            ]
        );
    }

    #[test]
    fn test_zero_loops_stops_current() {
        let backend = MemoryAudio::new(100);
        let mut player = player(&backend);
        player.play("a.ogg", -1).unwrap();
        assert_eq!(player.play("b.ogg", 0), Ok(CueProgress::Resolved));
        assert_eq!(backend.now_playing(), None);
    }

    #[test]
    fn test_load_failure_and_idempotent_stop() {
        let backend = MemoryAudio::new(100).with_missing("gone.ogg");
        let mut player = player(&backend);
        assert!(matches!(
            player.play("gone.ogg", 1),
            Err(AssetError::LoadFailed { .. })
        ));

        player.stop();
        player.stop();
        assert!(!player.is_playing());
        // 没有在播放的音频时不会调用后端
        assert_eq!(backend.calls(), vec!["load:gone.ogg"]);
    }
}
