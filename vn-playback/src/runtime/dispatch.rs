//! # Dispatch 模块
//!
//! 调度循环：取出下一行指令并执行。
//!
//! ## 分发规则
//!
//! ```text
//! Clear      → 清空文本，字符计数归零，继续下一行
//! Shake      → 等待震屏结束，继续下一行
//! AudioPlay  → 等待音频（无限循环则等待开始），继续下一行
//! AudioStop  → 停止音频，继续下一行
//! Dialogue   → 背景过渡 → 立绘 → 首句淡入 → 逐字显示，然后等待下一次推进
//! ```
//!
//! 瞬时指令在循环内直接继续，不递归。
//! 行索引到达场景末尾时淡出、等待场景切换延迟，再加载下一个场景。

use tracing::{debug, info, warn};

use super::Task;
use super::session::Session;
use crate::effects::{CueProgress, Transition, fade, shake};
use crate::error::{AssetError, AssetKind};
use crate::event::PlaybackEvent;
use crate::script::{CharacterPosition, LineDirective, PortraitChange};
use crate::state::PlaybackPhase;
use crate::typewriter::TypeStep;

/// 处理中的对话行
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingDialogue {
    pub text: String,
    pub character: Option<PortraitChange>,
    pub position: Option<CharacterPosition>,
}

impl Session {
    /// 分发下一行
    ///
    /// 忙碌、隐藏或过渡期间直接返回。
    pub(super) fn dispatch(&mut self) {
        if self.cursor.busy || self.cursor.hidden || self.cursor.fading || self.cursor.transitioning
        {
            return;
        }

        loop {
            self.cursor.busy = true;
            self.cursor.phase = PlaybackPhase::LineDispatch;

            let line = self
                .script
                .as_ref()
                .and_then(|script| script.get(self.cursor.line_index))
                .cloned();
            let Some(line) = line else {
                self.end_scene();
                return;
            };

            debug!(line = self.cursor.line_index, tag = line.tag(), "分发指令");
            match line {
                LineDirective::Clear => {
                    self.stage.clear_text();
                    self.cursor.char_count = 0;
                }
                LineDirective::Shake { intensity } => {
                    if let Some(duration_ms) = shake::perform(&mut self.stage, intensity) {
                        self.cursor.phase = PlaybackPhase::EffectRunning;
                        self.scheduler.schedule(duration_ms, Task::ShakeDone);
                        return;
                    }
                    debug!(intensity, "震屏强度超出范围，忽略");
                }
                LineDirective::AudioPlay { path, loop_count } => {
                    match self.audio.play(&path, loop_count) {
                        Ok(CueProgress::Repeating { after_ms }) => {
                            self.cursor.phase = PlaybackPhase::EffectRunning;
                            self.scheduler.schedule(after_ms, Task::CueEnded);
                            return;
                        }
                        Ok(CueProgress::Resolved) => {}
                        Err(e) => self.report_asset_failure(AssetKind::Audio, e),
                    }
                }
                LineDirective::AudioStop => self.audio.stop(),
                LineDirective::Dialogue {
                    text,
                    background,
                    character,
                    position,
                } => {
                    self.pending = Some(PendingDialogue {
                        text,
                        character,
                        position,
                    });
                    self.begin_dialogue(background.as_deref());
                    return;
                }
            }

            // 瞬时指令：释放并直接继续下一行
            self.cursor.line_index += 1;
            self.cursor.busy = false;
        }
    }

    /// 定时任务到期
    pub(super) fn run_task(&mut self, task: Task) {
        match task {
            Task::TypeStep => self.type_step(),
            Task::BackgroundDone => {
                self.background.finish(&mut self.stage);
                self.after_background();
            }
            Task::FadeInDone => {
                self.cursor.fading = false;
                self.cursor.first_line_of_scene = false;
                self.reveal_line();
            }
            Task::ShakeDone => {
                shake::finish(&mut self.stage);
                self.continue_after_effect();
            }
            Task::CueEnded => match self.audio.repetition_ended() {
                Ok(CueProgress::Repeating { after_ms }) => {
                    self.scheduler.schedule(after_ms, Task::CueEnded);
                }
                Ok(CueProgress::Resolved) => self.continue_after_effect(),
                Err(e) => {
                    self.report_asset_failure(AssetKind::Audio, e);
                    self.continue_after_effect();
                }
            },
            Task::FadeOutDone => {
                fade::finish_fade_out(&mut self.stage);
                self.cursor.fading = false;
                self.cursor.transitioning = true;
                self.cursor.busy = false;
                self.scheduler
                    .schedule(self.config.scene_transition_delay_ms, Task::SceneTransition);
            }
            Task::SceneTransition => {
                self.cursor.transitioning = false;
                self.cursor.scene_ordinal += 1;
                self.load_scene();
            }
            Task::AutoAdvance => {
                self.mode_timer = None;
                if self.cursor.auto_mode {
                    self.dispatch();
                }
            }
            Task::SkipAdvance => {
                self.mode_timer = None;
                if self.cursor.skip_mode {
                    self.dispatch();
                }
            }
        }
    }

    /// 瞬时指令的效果结束：前进一行并继续
    fn continue_after_effect(&mut self) {
        self.cursor.line_index += 1;
        self.cursor.busy = false;
        self.dispatch();
    }

    fn report_asset_failure(&mut self, kind: AssetKind, error: AssetError) {
        warn!(kind = %kind, error = %error, "资源加载失败，继续播放");
        self.events.push(PlaybackEvent::AssetFailed {
            kind,
            reference: error.path().to_string(),
            reason: error.to_string(),
        });
    }

    // ========== 对话行 ==========

    fn begin_dialogue(&mut self, background: Option<&str>) {
        self.cursor.phase = PlaybackPhase::EffectRunning;

        if let Some(reference) = background {
            let duration_ms = self.config.background_transition_ms;
            match self
                .background
                .transition_to(&mut self.stage, reference, duration_ms)
            {
                Transition::Unchanged => {}
                Transition::Crossfade { duration_ms } => {
                    self.scheduler.schedule(duration_ms, Task::BackgroundDone);
                    return;
                }
                Transition::HardSwap(e) => self.report_asset_failure(AssetKind::Image, e),
            }
        }

        self.after_background();
    }

    fn after_background(&mut self) {
        if let Some(pending) = &self.pending {
            match &pending.character {
                Some(PortraitChange::Show(portrait)) => {
                    self.stage.set_character(Some(portrait), pending.position);
                }
                Some(PortraitChange::Clear) => self.stage.set_character(None, pending.position),
                None => self.stage.set_position(pending.position),
            }
        }

        if self.cursor.first_line_of_scene {
            self.cursor.fading = true;
            let duration_ms = fade::fade_in(&mut self.stage, &self.config);
            self.scheduler.schedule(duration_ms, Task::FadeInDone);
            return;
        }

        self.reveal_line();
    }

    fn reveal_line(&mut self) {
        let text = self
            .pending
            .as_ref()
            .map(|pending| pending.text.clone())
            .unwrap_or_default();

        if self
            .cursor
            .accumulate_text(text.chars().count(), self.config.char_limit)
        {
            self.stage.clear_text();
        }
        self.stage.begin_line();

        if self.cursor.skip_mode {
            self.stage.append(&text);
            self.finish_line();
        } else if self.typewriter.start(&text) {
            self.cursor.phase = PlaybackPhase::TypingRunning;
            self.type_step();
        } else {
            self.finish_line();
        }
    }

    fn type_step(&mut self) {
        match self.typewriter.step() {
            TypeStep::Char { ch, delay_ms } => {
                let mut buf = [0u8; 4];
                self.stage.append(ch.encode_utf8(&mut buf));
                self.scheduler.schedule(delay_ms, Task::TypeStep);
            }
            TypeStep::Flush(rest) => {
                self.stage.append(&rest);
                self.finish_line();
            }
            TypeStep::Done => self.finish_line(),
        }
    }

    /// 对话行显示完毕：前进一行，释放忙碌标志，按模式排入下一次推进
    fn finish_line(&mut self) {
        let text = self
            .pending
            .take()
            .map(|pending| pending.text)
            .unwrap_or_default();

        self.cursor.line_index += 1;
        self.cursor.busy = false;
        self.cursor.phase = PlaybackPhase::LineDispatch;
        self.events.push(PlaybackEvent::LineRevealed { text });

        if self.cursor.skip_mode || self.cursor.auto_mode {
            self.schedule_mode_advance();
        }
    }

    // ========== 场景 ==========

    /// 场景结束：淡出到全黑（保持忙碌直到淡出完成）
    fn end_scene(&mut self) {
        debug!(
            chapter = ?self.cursor.chapter,
            ordinal = self.cursor.scene_ordinal,
            "场景结束"
        );
        self.cursor.phase = PlaybackPhase::SceneEnding;
        self.cursor.fading = true;
        let duration_ms = fade::fade_out(&mut self.stage, &self.config);
        self.scheduler.schedule(duration_ms, Task::FadeOutDone);
    }

    /// 加载当前坐标的场景
    ///
    /// 场景加载失败时跳到下一个序号；章节内没有更多场景时进入下一章；
    /// 没有更多章节时回到标题。
    pub(super) fn load_scene(&mut self) {
        loop {
            self.cursor.phase = PlaybackPhase::SceneLoading;

            let Some(chapter) = self.cursor.chapter.clone() else {
                self.exit_to_menu();
                return;
            };
            let Some(coordinate) = self.cursor.coordinate() else {
                self.exit_to_menu();
                return;
            };
            let Some(index) = self.index.as_ref() else {
                self.exit_to_menu();
                return;
            };

            let Some(file) = index.scene_file(&coordinate).map(str::to_string) else {
                self.cursor.phase = PlaybackPhase::ChapterRollover;
                match index.next_chapter(&chapter).map(str::to_string) {
                    Some(next) => {
                        info!(from = %chapter, to = %next, "进入下一章节");
                        self.cursor.chapter = Some(next.clone());
                        self.cursor.scene_ordinal = 0;
                        self.events.push(PlaybackEvent::ChapterStarted { chapter: next });
                        continue;
                    }
                    None => {
                        info!("所有章节播放完毕");
                        self.exit_to_menu();
                        return;
                    }
                }
            };

            match self.repository.scene_script(&file) {
                Ok(script) => {
                    info!(chapter = %chapter, ordinal = coordinate.ordinal, file = %file, "场景开始");
                    self.script = Some(script);
                    self.initialize_scene();
                    self.events.push(PlaybackEvent::SceneStarted {
                        chapter,
                        ordinal: coordinate.ordinal,
                        file,
                    });
                    self.dispatch();
                    return;
                }
                Err(e) => {
                    warn!(file = %file, error = %e, "场景加载失败，跳过");
                    self.events.push(PlaybackEvent::SceneSkipped {
                        file,
                        reason: e.to_string(),
                    });
                    self.cursor.scene_ordinal += 1;
                }
            }
        }
    }

    /// 场景初始化：首行的背景和立绘直接替换，遮罩设为全黑，清空文本
    fn initialize_scene(&mut self) {
        self.cursor.begin_scene();
        self.cursor.busy = false;
        self.pending = None;

        let first = self.script.as_ref().and_then(|script| script.get(0)).cloned();
        match first {
            Some(LineDirective::Dialogue {
                background,
                character,
                position,
                ..
            }) => {
                if let Some(reference) = background {
                    self.stage.set_background(&reference);
                }
                match character {
                    Some(PortraitChange::Show(portrait)) => self
                        .stage
                        .set_character(Some(&portrait), Some(position.unwrap_or_default())),
                    Some(PortraitChange::Clear) => self.stage.set_character(None, None),
                    None => {}
                }
            }
            Some(_) => {}
            None => self.stage.set_character(None, None),
        }

        fade::reset_opaque(&mut self.stage);
        self.stage.clear_text();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaybackConfig;
    use crate::effects::{MemoryAudio, MemoryImages};
    use crate::runtime::Collaborators;
    use crate::save::MemoryStore;
    use crate::script::MemoryRepository;
    use crate::stage::MemorySurface;

    fn session(repo: MemoryRepository) -> (Session, MemorySurface, MemoryAudio) {
        let surface = MemorySurface::new();
        let audio = MemoryAudio::new(500);
        let session = Session::new(
            PlaybackConfig::default(),
            Collaborators {
                repository: Box::new(repo),
                surface: Box::new(surface.clone()),
                images: Box::new(MemoryImages::new()),
                audio: Box::new(audio.clone()),
                store: Box::new(MemoryStore::new()),
            },
        )
        .unwrap();
        (session, surface, audio)
    }

    #[test]
    fn test_instantaneous_lines_chain_without_signal() {
        let repo = MemoryRepository::new().with_chapter("01", ["a.json"]).with_scene(
            "a.json",
            vec![
                LineDirective::Clear,
                LineDirective::AudioStop,
                LineDirective::Shake { intensity: 0 },
                LineDirective::dialogue("hi"),
            ],
        );
        let (mut session, _, _) = session(repo);
        session.start_session();

        // 三条瞬时指令立即执行完，停在对话行的淡入
        assert_eq!(session.cursor().line_index, 3);
        assert!(session.cursor().fading);
        assert!(session.cursor().busy);
    }

    #[test]
    fn test_shake_waits_for_duration() {
        let repo = MemoryRepository::new().with_chapter("01", ["a.json"]).with_scene(
            "a.json",
            vec![LineDirective::Shake { intensity: 60 }, LineDirective::dialogue("x")],
        );
        let (mut session, surface, _) = session(repo);
        session.start_session();

        assert_eq!(session.cursor().phase, PlaybackPhase::EffectRunning);
        assert_eq!(session.next_timer_due(), Some(800));
        session.advance_time(799);
        assert_eq!(session.cursor().line_index, 0);
        session.advance_time(1);
        assert_eq!(session.cursor().line_index, 1);
        assert_eq!(surface.state().shake, None);
    }

    #[test]
    fn test_audio_repetitions_block_until_last_ends() {
        let repo = MemoryRepository::new().with_chapter("01", ["a.json"]).with_scene(
            "a.json",
            vec![
                LineDirective::AudioPlay {
                    path: "se.wav".to_string(),
                    loop_count: 3,
                },
                LineDirective::dialogue("x"),
            ],
        );
        let (mut session, _, audio) = session(repo);
        session.start_session();

        session.advance_time(1499);
        assert_eq!(session.cursor().line_index, 0);
        session.advance_time(1);
        assert_eq!(session.cursor().line_index, 1);
        assert_eq!(
            audio.calls(),
            vec!["load:se.wav", "play:se.wav", "play:se.wav", "play:se.wav"]
        );
    }

    #[test]
    fn test_missing_audio_does_not_block() {
        let repo = MemoryRepository::new().with_chapter("01", ["a.json"]).with_scene(
            "a.json",
            vec![
                LineDirective::AudioPlay {
                    path: "gone.ogg".to_string(),
                    loop_count: 1,
                },
                LineDirective::dialogue("x"),
            ],
        );
        let surface = MemorySurface::new();
        let mut session = Session::new(
            PlaybackConfig::default(),
            Collaborators {
                repository: Box::new(repo),
                surface: Box::new(surface),
                images: Box::new(MemoryImages::new()),
                audio: Box::new(MemoryAudio::new(100).with_missing("gone.ogg")),
                store: Box::new(MemoryStore::new()),
            },
        )
        .unwrap();
        session.start_session();

        assert_eq!(session.cursor().line_index, 1);
        assert!(session.drain_events().iter().any(|e| matches!(
            e,
            PlaybackEvent::AssetFailed {
                kind: AssetKind::Audio,
                ..
            }
        )));
    }

    #[test]
    fn test_first_line_sets_scene_without_crossfade() {
        let repo = MemoryRepository::new().with_chapter("01", ["a.json"]).with_scene(
            "a.json",
            vec![LineDirective::Dialogue {
                text: "hello".to_string(),
                background: Some("room.png".to_string()),
                character: Some(PortraitChange::Show("alice.png".to_string())),
                position: None,
            }],
        );
        let (mut session, surface, _) = session(repo);
        session.start_session();

        assert_eq!(surface.state().background.as_deref(), Some("room.png"));
        assert_eq!(surface.state().overlay, None);
        assert_eq!(surface.state().position, Some(CharacterPosition::Center));
        // 首句淡入
        assert_eq!(surface.state().fade_opacity, 0.5);
        assert!(session.cursor().fading);

        session.advance_time(1000);
        assert!(!session.cursor().fading);
        assert!(session.is_typing());
        session.run_until_idle(10_000);
        assert_eq!(surface.text(), "hello");
        assert_eq!(session.cursor().line_index, 1);
        assert!(!session.cursor().busy);
    }

    #[test]
    fn test_scene_load_failure_skips_to_next_ordinal() {
        let repo = MemoryRepository::new()
            .with_chapter("01", ["bad.json", "good.json"])
            .with_scene_json("bad.json", r#"{ "lines": [{ "text": "a", "clear": true }] }"#)
            .with_scene("good.json", vec![LineDirective::dialogue("ok")]);
        let (mut session, _, _) = session(repo);
        session.start_session();

        assert_eq!(session.cursor().scene_ordinal, 1);
        let events = session.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            PlaybackEvent::SceneSkipped { file, .. } if file == "bad.json"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            PlaybackEvent::SceneStarted { file, .. } if file == "good.json"
        )));
    }
}
