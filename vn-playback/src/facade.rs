//! # Facade 模块
//!
//! 引擎门面：把宿主输入转换为会话操作，并管理菜单层。
//!
//! 菜单（存档、读档、设置）打开时推进信号被忽略；标题画面上只接受开始游戏和读档。

use tracing::debug;

use crate::event::PlaybackEvent;
use crate::input::Input;
use crate::runtime::Session;
use crate::save::SlotSummary;

/// 当前打开的菜单
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    None,
    Save,
    Load,
    Settings,
}

/// 槽位列表中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    pub slot: u32,
    /// 空槽位为 None
    pub summary: Option<SlotSummary>,
}

impl SlotEntry {
    /// 列表中显示的时间（空槽位为空字符串）
    pub fn date_label(&self) -> String {
        self.summary
            .as_ref()
            .map(SlotSummary::formatted_time)
            .unwrap_or_default()
    }

    /// 列表中显示的文本
    pub fn info_label(&self) -> String {
        self.summary
            .as_ref()
            .map(SlotSummary::short_preview)
            .unwrap_or_else(|| "空槽位".to_string())
    }
}

/// 引擎门面
pub struct Engine {
    session: Session,
    overlay: Overlay,
}

impl Engine {
    /// 创建引擎
    pub fn new(session: Session) -> Self {
        Self {
            session,
            overlay: Overlay::None,
        }
    }

    /// 会话
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 可变会话（宿主推进时间用）
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// 当前菜单
    pub fn overlay(&self) -> Overlay {
        self.overlay
    }

    /// 是否在标题画面
    pub fn on_menu(&self) -> bool {
        self.session.cursor().is_idle()
    }

    /// 处理一个输入
    pub fn handle(&mut self, input: Input) {
        match input {
            Input::StartSession => {
                if self.on_menu() {
                    self.overlay = Overlay::None;
                    self.session.start_session();
                }
            }
            Input::Progress => {
                if self.on_menu() || self.overlay != Overlay::None {
                    debug!(overlay = ?self.overlay, "推进信号被忽略");
                    return;
                }
                self.session.advance();
            }
            Input::ToggleAuto => {
                if !self.on_menu() {
                    let enabled = !self.session.cursor().auto_mode;
                    self.session.set_auto_mode(enabled);
                }
            }
            Input::ToggleSkip => {
                if !self.on_menu() {
                    let enabled = !self.session.cursor().skip_mode;
                    self.session.set_skip_mode(enabled);
                }
            }
            Input::ToggleHidden => {
                if !self.on_menu() {
                    let hidden = !self.session.cursor().hidden;
                    self.session.set_hidden(hidden);
                }
            }
            Input::OpenSave => {
                if !self.on_menu() {
                    self.overlay = Overlay::Save;
                }
            }
            Input::OpenLoad => self.overlay = Overlay::Load,
            Input::OpenSettings => self.overlay = Overlay::Settings,
            Input::CloseSave | Input::CloseLoad | Input::CloseSettings => {
                self.overlay = Overlay::None;
            }
            Input::SaveToSlot(slot) => {
                self.session.save_to_slot(slot);
            }
            Input::LoadFromSlot(slot) => {
                if self.session.load_from_slot(slot) && self.overlay == Overlay::Load {
                    self.overlay = Overlay::None;
                }
            }
            Input::DeleteSlot(slot) => {
                self.delete_slot(slot);
            }
            Input::AdjustAutoSpeed(delay_ms) => self.session.set_auto_advance_delay(delay_ms),
            Input::ExitToMenu => {
                self.overlay = Overlay::None;
                if !self.on_menu() {
                    self.session.exit_to_menu();
                }
            }
        }
    }

    /// 推进虚拟时间
    pub fn advance_time(&mut self, delta_ms: u64) {
        self.session.advance_time(delta_ms);
    }

    /// 取走事件
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.session.drain_events()
    }

    /// 删除槽位
    pub fn delete_slot(&mut self, slot: u32) -> bool {
        self.session.delete_slot(slot)
    }

    /// 所有槽位的列表信息
    pub fn slot_listing(&self) -> Vec<SlotEntry> {
        let snapshots = self.session.snapshots();
        (1..=snapshots.max_slots())
            .map(|slot| SlotEntry {
                slot,
                summary: snapshots.describe(slot),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaybackConfig;
    use crate::effects::{MemoryAudio, MemoryImages};
    use crate::runtime::Collaborators;
    use crate::save::MemoryStore;
    use crate::script::{LineDirective, MemoryRepository};
    use crate::stage::MemorySurface;

    fn engine() -> Engine {
        let repo = MemoryRepository::new().with_chapter("01", ["a.json"]).with_scene(
            "a.json",
            vec![LineDirective::dialogue("第一句"), LineDirective::dialogue("第二句")],
        );
        let session = Session::new(
            PlaybackConfig::default(),
            Collaborators {
                repository: Box::new(repo),
                surface: Box::new(MemorySurface::new()),
                images: Box::new(MemoryImages::new()),
                audio: Box::new(MemoryAudio::new(100)),
                store: Box::new(MemoryStore::new()),
            },
        )
        .unwrap();
        Engine::new(session)
    }

    #[test]
    fn test_progress_ignored_on_menu_and_overlay() {
        let mut engine = engine();
        engine.handle(Input::Progress);
        assert!(engine.on_menu());

        engine.handle(Input::StartSession);
        engine.session_mut().run_until_idle(10_000);
        assert_eq!(engine.session().cursor().line_index, 1);

        engine.handle(Input::OpenSettings);
        engine.handle(Input::Progress);
        assert_eq!(engine.session().cursor().line_index, 1);

        engine.handle(Input::CloseSettings);
        engine.handle(Input::Progress);
        assert!(engine.session().is_typing());
    }

    #[test]
    fn test_manual_progress_disables_modes() {
        let mut engine = engine();
        engine.handle(Input::StartSession);
        engine.session_mut().run_until_idle(10_000);

        engine.handle(Input::ToggleAuto);
        assert!(engine.session().cursor().auto_mode);
        engine.handle(Input::Progress);
        assert!(!engine.session().cursor().auto_mode);
    }

    #[test]
    fn test_slot_listing() {
        let mut engine = engine();
        engine.handle(Input::StartSession);
        engine.session_mut().run_until_idle(10_000);
        engine.handle(Input::OpenSave);
        engine.handle(Input::SaveToSlot(2));

        let listing = engine.slot_listing();
        assert_eq!(listing.len(), 5);
        assert_eq!(listing[0].info_label(), "空槽位");
        assert_eq!(listing[0].date_label(), "");
        assert_eq!(listing[1].info_label(), "第一句");
        assert!(!listing[1].date_label().is_empty());

        assert!(engine.delete_slot(2));
        assert!(engine.slot_listing()[1].summary.is_none());
    }

    #[test]
    fn test_load_closes_overlay() {
        let mut engine = engine();
        engine.handle(Input::StartSession);
        engine.session_mut().run_until_idle(10_000);
        engine.handle(Input::SaveToSlot(1));
        engine.handle(Input::ExitToMenu);
        assert!(engine.on_menu());

        engine.handle(Input::OpenLoad);
        engine.handle(Input::LoadFromSlot(3));
        assert_eq!(engine.overlay(), Overlay::Load);

        engine.handle(Input::LoadFromSlot(1));
        assert_eq!(engine.overlay(), Overlay::None);
        assert!(!engine.on_menu());
    }
}
