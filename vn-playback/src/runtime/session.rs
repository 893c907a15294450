//! # Session 模块
//!
//! 播放会话：持有游标、舞台、效果播放器和所有外部协作者。
//!
//! ## 执行模型
//!
//! ```text
//! Host                               Session
//!   │── start_session / advance ──────►│ 分发行指令，遇到可等待的效果时排入定时器
//!   │── advance_time(dt) ─────────────►│ 触发到期的定时器，继续调度循环
//!   │◄── drain_events() ───────────────│
//! ```
//!
//! 会话是单线程的。`busy` 标志是唯一的互斥手段：忙碌期间到达的推进信号被丢弃，
//! 只有逐字显示期间的推进信号会转换为跳过请求。

use tracing::{debug, info, warn};

use super::Task;
use super::dispatch::PendingDialogue;
use crate::config::PlaybackConfig;
use crate::effects::{AudioBackend, AudioCuePlayer, BackgroundTransitioner, ImageLoader};
use crate::error::ConfigError;
use crate::event::PlaybackEvent;
use crate::save::{KeyValueStore, RenderSummary, SaveSlot, SnapshotStore, DEFAULT_PREVIEW};
use crate::scheduler::{Scheduler, TimerId};
use crate::script::{SceneIndex, SceneScript, ScriptRepository};
use crate::stage::{RenderSurface, Stage};
use crate::state::{PlaybackCursor, PlaybackPhase};
use crate::typewriter::Typewriter;

/// 会话的外部协作者
pub struct Collaborators {
    pub repository: Box<dyn ScriptRepository>,
    pub surface: Box<dyn RenderSurface>,
    pub images: Box<dyn ImageLoader>,
    pub audio: Box<dyn AudioBackend>,
    pub store: Box<dyn KeyValueStore>,
}

/// 播放会话
pub struct Session {
    pub(super) config: PlaybackConfig,
    pub(super) cursor: PlaybackCursor,
    pub(super) stage: Stage,
    pub(super) typewriter: Typewriter,
    pub(super) background: BackgroundTransitioner,
    pub(super) audio: AudioCuePlayer,
    pub(super) snapshots: SnapshotStore,
    pub(super) repository: Box<dyn ScriptRepository>,
    pub(super) scheduler: Scheduler<Task>,
    pub(super) index: Option<SceneIndex>,
    pub(super) script: Option<SceneScript>,
    /// 正在处理的对话行（等待效果结束期间保存）
    pub(super) pending: Option<PendingDialogue>,
    /// 自动/快进模式的推进定时器
    pub(super) mode_timer: Option<TimerId>,
    pub(super) events: Vec<PlaybackEvent>,
}

impl Session {
    /// 创建会话
    ///
    /// 配置无效时返回错误。自动播放间隔从持久化存储读取。
    pub fn new(config: PlaybackConfig, parts: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;

        let snapshots = SnapshotStore::new(parts.store, config.max_save_slots);
        let mut session = Self {
            cursor: PlaybackCursor::new(config.default_auto_delay_ms),
            stage: Stage::new(parts.surface),
            typewriter: Typewriter::new(config.typing_speed_ms),
            background: BackgroundTransitioner::new(parts.images),
            audio: AudioCuePlayer::new(parts.audio),
            snapshots,
            repository: parts.repository,
            scheduler: Scheduler::new(),
            index: None,
            script: None,
            pending: None,
            mode_timer: None,
            events: Vec::new(),
            config,
        };
        session.cursor.auto_advance_delay_ms = session.stored_auto_delay();
        Ok(session)
    }

    /// 当前配置
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// 播放游标
    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }

    /// 舞台（渲染状态镜像）
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// 当前场景脚本
    pub fn script(&self) -> Option<&SceneScript> {
        self.script.as_ref()
    }

    /// 是否正在逐字显示
    pub fn is_typing(&self) -> bool {
        self.typewriter.is_active()
    }

    /// 逐字显示期间是否已请求跳过
    pub fn skip_requested(&self) -> bool {
        self.typewriter.cancel_requested()
    }

    /// 存档管理器
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    // ========== 对外操作 ==========

    /// 开始游戏
    ///
    /// 读取场景索引，从第一个章节的第一个场景开始播放。
    /// 索引不可用或为空时直接回到标题。
    pub fn start_session(&mut self) {
        if !self.cursor.is_idle() {
            debug!("会话已在进行中，忽略开始请求");
            return;
        }

        self.cursor = PlaybackCursor::new(self.stored_auto_delay());
        self.cursor.phase = PlaybackPhase::SceneLoading;
        self.events.push(PlaybackEvent::SessionStarted);
        self.stage.set_fade(1.0, 0);

        let index = match self.repository.scene_index() {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "场景索引加载失败");
                self.exit_to_menu();
                return;
            }
        };

        let chapter = index.first_chapter().to_string();
        info!(chapter = %chapter, chapters = index.len(), "开始游戏");
        self.index = Some(index);
        self.cursor.chapter = Some(chapter.clone());
        self.cursor.scene_ordinal = 0;
        self.events.push(PlaybackEvent::ChapterStarted { chapter });
        self.load_scene();
    }

    /// 推进信号（点击/回车）
    pub fn advance(&mut self) {
        if self.cursor.is_idle() {
            return;
        }
        if self.cursor.fading || self.cursor.transitioning {
            debug!("过渡期间的推进信号被丢弃");
            return;
        }
        if self.cursor.hidden {
            self.set_hidden(false);
            return;
        }
        if self.cursor.auto_mode || self.cursor.skip_mode {
            self.cursor.clear_modes();
            self.cancel_mode_timer();
        }
        if self.typewriter.is_active() {
            self.typewriter.cancel();
            return;
        }
        self.dispatch();
    }

    /// 开关自动模式（与快进模式互斥）
    pub fn set_auto_mode(&mut self, enabled: bool) {
        self.cancel_mode_timer();
        self.cursor.auto_mode = enabled;
        if enabled {
            self.cursor.skip_mode = false;
            if self.can_self_advance() {
                self.schedule_mode_advance();
            }
        }
        debug!(enabled, "自动模式");
    }

    /// 开关快进模式（与自动模式互斥）
    pub fn set_skip_mode(&mut self, enabled: bool) {
        self.cancel_mode_timer();
        self.cursor.skip_mode = enabled;
        if enabled {
            self.cursor.auto_mode = false;
            if self.typewriter.is_active() {
                self.typewriter.cancel();
            } else if self.can_self_advance() {
                self.schedule_mode_advance();
            }
        }
        debug!(enabled, "快进模式");
    }

    /// 隐藏/显示文本区
    ///
    /// 隐藏时强制关闭自动和快进模式。游标位置不变。
    pub fn set_hidden(&mut self, hidden: bool) {
        self.cursor.hidden = hidden;
        if hidden {
            self.cursor.clear_modes();
            self.cancel_mode_timer();
        }
        self.stage.set_text_visible(!hidden);
    }

    /// 设置自动播放间隔并持久化
    pub fn set_auto_advance_delay(&mut self, delay_ms: u64) {
        let delay_ms = self.config.clamp_auto_delay(delay_ms);
        self.cursor.auto_advance_delay_ms = delay_ms;
        self.snapshots.set_auto_speed(delay_ms);
    }

    /// 保存到槽位
    ///
    /// 标题画面和逐字显示过程中拒绝存档。
    pub fn save_to_slot(&mut self, slot: u32) -> bool {
        let ok = match self.cursor.snapshot() {
            Some(_) if self.typewriter.is_active() => {
                warn!(slot, "文本显示中，无法存档");
                false
            }
            Some(cursor) => {
                let data = SaveSlot::new(cursor, self.render_summary());
                self.snapshots.save(slot, &data)
            }
            None => {
                warn!(slot, "标题画面无法存档");
                false
            }
        };
        self.events.push(PlaybackEvent::Saved { slot, ok });
        ok
    }

    /// 从槽位读取
    ///
    /// 重新加载场景索引和场景脚本，确认存档位置有效后才覆盖当前状态。
    pub fn load_from_slot(&mut self, slot: u32) -> bool {
        let ok = self.try_restore(slot);
        self.events.push(PlaybackEvent::Loaded { slot, ok });
        ok
    }

    fn try_restore(&mut self, slot: u32) -> bool {
        let Some(data) = self.snapshots.load(slot) else {
            info!(slot, "槽位没有存档");
            return false;
        };

        let index = match self.repository.scene_index() {
            Ok(index) => index,
            Err(e) => {
                warn!(slot, error = %e, "读档时场景索引加载失败");
                return false;
            }
        };

        let coordinate = data.cursor.coordinate();
        let Some(file) = index.scene_file(&coordinate).map(str::to_string) else {
            warn!(
                slot,
                chapter = %coordinate.chapter,
                ordinal = coordinate.ordinal,
                "存档的场景已不存在"
            );
            return false;
        };

        let script = match self.repository.scene_script(&file) {
            Ok(script) => script,
            Err(e) => {
                warn!(slot, file = %file, error = %e, "读档时场景加载失败");
                return false;
            }
        };

        self.scheduler.clear();
        self.mode_timer = None;
        self.typewriter.abort();
        self.audio.stop();
        self.pending = None;

        self.cursor.restore(&data.cursor);
        self.index = Some(index);
        self.script = Some(script);

        let render = &data.render;
        self.stage.restore(
            render.background.as_deref(),
            render.character.as_deref(),
            render.position,
            &render.rendered_text,
        );
        self.stage.set_shake(None);
        self.stage.set_text_visible(true);
        self.stage.set_fade(self.config.faded_in_opacity, 0);

        info!(
            slot,
            chapter = %data.cursor.chapter,
            ordinal = data.cursor.scene_ordinal,
            line = data.cursor.line_index,
            "读档完成"
        );
        true
    }

    /// 删除槽位
    pub fn delete_slot(&mut self, slot: u32) -> bool {
        self.snapshots.delete(slot)
    }

    /// 回到标题
    ///
    /// 取消所有定时器、停止音频、清空缓存并重置游标。
    pub fn exit_to_menu(&mut self) {
        self.scheduler.clear();
        self.mode_timer = None;
        self.typewriter.abort();
        self.audio.cleanup();
        self.background.clear_cache();
        self.stage.reset();
        self.index = None;
        self.script = None;
        self.pending = None;
        self.cursor = PlaybackCursor::new(self.stored_auto_delay());
        self.events.push(PlaybackEvent::SessionEnded);
        info!("回到标题");
    }

    /// 当前画面的渲染摘要
    pub fn render_summary(&self) -> RenderSummary {
        let preview_text = self
            .cursor
            .line_index
            .checked_sub(1)
            .and_then(|i| self.script.as_ref()?.get(i))
            .and_then(|line| line.dialogue_text())
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(DEFAULT_PREVIEW)
            .to_string();

        RenderSummary {
            background: self
                .stage
                .overlay()
                .or(self.stage.background())
                .map(str::to_string),
            character: self.stage.character().map(str::to_string),
            position: self.stage.position(),
            rendered_text: self.stage.lines().to_vec(),
            preview_text,
        }
    }

    // ========== 时间 ==========

    /// 当前虚拟时间
    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    /// 下一个定时器的到期时间
    pub fn next_timer_due(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    /// 推进虚拟时间，依次触发窗口内到期的定时器
    ///
    /// 处理过程中新排入且仍在窗口内的定时器也会被触发。
    pub fn advance_time(&mut self, delta_ms: u64) {
        let target = self.scheduler.now_ms().saturating_add(delta_ms);
        while let Some(task) = self.scheduler.pop_due(target) {
            self.run_task(task);
        }
        self.scheduler.advance_to(target);
    }

    /// 连续触发定时器，直到没有定时器或超过 `max_ms`
    ///
    /// 返回是否已没有待触发的定时器。
    pub fn run_until_idle(&mut self, max_ms: u64) -> bool {
        let limit = self.scheduler.now_ms().saturating_add(max_ms);
        while let Some(task) = self.scheduler.pop_due(limit) {
            self.run_task(task);
        }
        self.scheduler.is_idle()
    }

    /// 取走累积的事件
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    // ========== 内部 ==========

    pub(super) fn stored_auto_delay(&self) -> u64 {
        self.snapshots
            .auto_speed()
            .map(|delay| self.config.clamp_auto_delay(delay))
            .unwrap_or(self.config.default_auto_delay_ms)
    }

    /// 当前是否可以排入自动/快进推进
    fn can_self_advance(&self) -> bool {
        !self.cursor.is_idle()
            && !self.cursor.busy
            && !self.cursor.hidden
            && !self.typewriter.is_active()
    }

    pub(super) fn cancel_mode_timer(&mut self) {
        if let Some(id) = self.mode_timer.take() {
            self.scheduler.cancel(id);
        }
    }

    /// 按当前模式排入下一次推进
    pub(super) fn schedule_mode_advance(&mut self) {
        self.cancel_mode_timer();
        if self.cursor.skip_mode {
            let id = self
                .scheduler
                .schedule(self.config.skip_advance_delay_ms, Task::SkipAdvance);
            self.mode_timer = Some(id);
        } else if self.cursor.auto_mode {
            let id = self
                .scheduler
                .schedule(self.cursor.auto_advance_delay_ms, Task::AutoAdvance);
            self.mode_timer = Some(id);
        }
    }
}
