//! # Stage 模块
//!
//! 渲染表面抽象和渲染状态镜像。
//!
//! ## 设计说明
//!
//! - [`RenderSurface`] 是宿主实现的绘制接口，所有调用都是"发出即忘"
//! - [`Stage`] 持有渲染表面，并记录自己已经提交的状态（背景、立绘、文本……）
//! - 存档时从 `Stage` 读取渲染摘要，读档时通过 `Stage` 原样恢复
//!
//! 核心逻辑只通过 `Stage` 操作渲染表面，保证镜像与表面一致。

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::effects::ShakeTier;
use crate::script::CharacterPosition;

/// 渲染表面
///
/// 没有返回值。需要等待的动画由调用方自行计时。
pub trait RenderSurface {
    /// 立即替换底层背景
    fn set_background(&mut self, reference: &str);

    /// 移除底层背景
    fn clear_background(&mut self);

    /// 在底层背景之上放置一个完全透明的叠加背景
    fn show_overlay(&mut self, reference: &str);

    /// 在 `duration_ms` 内把叠加背景的透明度过渡到 `opacity`
    fn animate_overlay_opacity(&mut self, opacity: f32, duration_ms: u64);

    /// 移除叠加背景
    fn remove_overlay(&mut self);

    /// 替换立绘和立绘位置（`None` 表示清除立绘）
    fn set_character(&mut self, portrait: Option<&str>, position: CharacterPosition);

    /// 在文本区开始新的一行
    fn begin_text_line(&mut self);

    /// 向当前行追加文本
    fn append_text(&mut self, fragment: &str);

    /// 清空文本区
    fn clear_text(&mut self);

    /// 设置淡入淡出遮罩的透明度（`duration_ms = 0` 表示立即生效）
    fn set_fade_opacity(&mut self, opacity: f32, duration_ms: u64);

    /// 设置震屏效果（`None` 表示清除）
    fn set_shake(&mut self, tier: Option<ShakeTier>);

    /// 显示/隐藏文本区和辅助控件
    fn set_text_visible(&mut self, visible: bool);

    /// 强制刷新布局，使之前的调用在动画开始前生效
    fn flush(&mut self) {}
}

/// 舞台：渲染表面 + 已提交状态的镜像
pub struct Stage {
    surface: Box<dyn RenderSurface>,
    background: Option<String>,
    overlay: Option<String>,
    character: Option<String>,
    position: Option<CharacterPosition>,
    lines: Vec<String>,
    fade_opacity: f32,
    shake: Option<ShakeTier>,
    text_visible: bool,
}

impl Stage {
    /// 创建舞台，初始为全黑遮罩
    pub fn new(surface: Box<dyn RenderSurface>) -> Self {
        Self {
            surface,
            background: None,
            overlay: None,
            character: None,
            position: None,
            lines: Vec::new(),
            fade_opacity: 1.0,
            shake: None,
            text_visible: true,
        }
    }

    /// 当前背景
    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    /// 当前叠加背景（交叉淡化进行中）
    pub fn overlay(&self) -> Option<&str> {
        self.overlay.as_deref()
    }

    /// 当前立绘
    pub fn character(&self) -> Option<&str> {
        self.character.as_deref()
    }

    /// 当前立绘位置（未设置过时为居中）
    pub fn position(&self) -> CharacterPosition {
        self.position.unwrap_or_default()
    }

    /// 已显示的文本行
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// 遮罩透明度
    pub fn fade_opacity(&self) -> f32 {
        self.fade_opacity
    }

    /// 当前震屏档位
    pub fn shake(&self) -> Option<ShakeTier> {
        self.shake
    }

    /// 文本区是否可见
    pub fn text_visible(&self) -> bool {
        self.text_visible
    }

    /// 立即替换背景
    pub fn set_background(&mut self, reference: &str) {
        self.surface.set_background(reference);
        self.background = Some(reference.to_string());
    }

    /// 移除背景
    pub fn clear_background(&mut self) {
        self.surface.clear_background();
        self.background = None;
    }

    /// 开始交叉淡化：放置透明叠加层，刷新布局，然后开始不透明度动画
    pub fn begin_crossfade(&mut self, reference: &str, duration_ms: u64) {
        self.surface.show_overlay(reference);
        self.surface.flush();
        self.surface.animate_overlay_opacity(1.0, duration_ms);
        self.overlay = Some(reference.to_string());
    }

    /// 结束交叉淡化：叠加层换入底层并移除
    pub fn finish_crossfade(&mut self) {
        if let Some(reference) = self.overlay.take() {
            self.surface.set_background(&reference);
            self.surface.remove_overlay();
            self.background = Some(reference);
        }
    }

    /// 替换立绘
    ///
    /// `position` 为 `None` 时沿用当前位置（从未设置过则居中）。
    pub fn set_character(&mut self, portrait: Option<&str>, position: Option<CharacterPosition>) {
        let position = position.or(self.position).unwrap_or_default();
        self.surface.set_character(portrait, position);
        self.character = portrait.map(str::to_string);
        self.position = Some(position);
    }

    /// 只更新立绘位置
    pub fn set_position(&mut self, position: Option<CharacterPosition>) {
        let portrait = self.character.clone();
        self.set_character(portrait.as_deref(), position);
    }

    /// 开始新的一行文本
    pub fn begin_line(&mut self) {
        self.surface.begin_text_line();
        self.lines.push(String::new());
    }

    /// 向当前行追加文本
    pub fn append(&mut self, fragment: &str) {
        if self.lines.is_empty() {
            self.begin_line();
        }
        self.surface.append_text(fragment);
        if let Some(line) = self.lines.last_mut() {
            line.push_str(fragment);
        }
    }

    /// 清空文本区
    pub fn clear_text(&mut self) {
        self.surface.clear_text();
        self.lines.clear();
    }

    /// 设置遮罩透明度
    pub fn set_fade(&mut self, opacity: f32, duration_ms: u64) {
        self.surface.set_fade_opacity(opacity, duration_ms);
        self.fade_opacity = opacity;
    }

    /// 设置震屏档位
    pub fn set_shake(&mut self, tier: Option<ShakeTier>) {
        self.surface.set_shake(tier);
        self.shake = tier;
    }

    /// 显示/隐藏文本区
    pub fn set_text_visible(&mut self, visible: bool) {
        self.surface.set_text_visible(visible);
        self.text_visible = visible;
    }

    /// 原样恢复画面（读档）
    pub fn restore(
        &mut self,
        background: Option<&str>,
        character: Option<&str>,
        position: CharacterPosition,
        lines: &[String],
    ) {
        if self.overlay.take().is_some() {
            self.surface.remove_overlay();
        }
        match background {
            Some(reference) => self.set_background(reference),
            None => self.clear_background(),
        }
        self.set_character(character, Some(position));
        self.clear_text();
        for line in lines {
            self.begin_line();
            self.append(line);
        }
    }

    /// 回到标题时清理画面
    pub fn reset(&mut self) {
        if self.overlay.take().is_some() {
            self.surface.remove_overlay();
        }
        self.clear_text();
        self.surface.set_character(None, CharacterPosition::Center);
        self.character = None;
        self.position = None;
        self.set_shake(None);
        self.set_text_visible(true);
        self.set_fade(1.0, 0);
    }
}

/// 内存渲染表面的状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceState {
    pub background: Option<String>,
    pub overlay: Option<String>,
    pub overlay_opacity: f32,
    pub character: Option<String>,
    pub position: Option<CharacterPosition>,
    pub lines: Vec<String>,
    pub fade_opacity: f32,
    pub shake: Option<ShakeTier>,
    pub text_visible: bool,
    /// 调用记录（用于断言调用顺序）
    pub log: Vec<String>,
}

/// 内存渲染表面
///
/// 克隆得到的句柄共享同一份状态，测试可以在交给 `Stage` 后继续观察。
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    state: Rc<RefCell<SurfaceState>>,
}

impl MemorySurface {
    /// 创建内存渲染表面
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SurfaceState {
                fade_opacity: 1.0,
                text_visible: true,
                ..Default::default()
            })),
        }
    }

    /// 读取当前状态
    pub fn state(&self) -> Ref<'_, SurfaceState> {
        self.state.borrow()
    }

    /// 当前文本（各行以换行连接）
    pub fn text(&self) -> String {
        self.state.borrow().lines.join("\n")
    }

    /// 清空调用记录
    pub fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut self.state.borrow_mut().log)
    }
}

impl RenderSurface for MemorySurface {
    fn set_background(&mut self, reference: &str) {
        let mut state = self.state.borrow_mut();
        state.background = Some(reference.to_string());
        state.log.push(format!("bg:{reference}"));
    }

    fn clear_background(&mut self) {
        let mut state = self.state.borrow_mut();
        state.background = None;
        state.log.push("bg_cleared".to_string());
    }

    fn show_overlay(&mut self, reference: &str) {
        let mut state = self.state.borrow_mut();
        state.overlay = Some(reference.to_string());
        state.overlay_opacity = 0.0;
        state.log.push(format!("overlay:{reference}"));
    }

    fn animate_overlay_opacity(&mut self, opacity: f32, duration_ms: u64) {
        let mut state = self.state.borrow_mut();
        state.overlay_opacity = opacity;
        state.log.push(format!("overlay_opacity:{opacity}/{duration_ms}"));
    }

    fn remove_overlay(&mut self) {
        let mut state = self.state.borrow_mut();
        state.overlay = None;
        state.overlay_opacity = 0.0;
        state.log.push("overlay_removed".to_string());
    }

    fn set_character(&mut self, portrait: Option<&str>, position: CharacterPosition) {
        let mut state = self.state.borrow_mut();
        state.character = portrait.map(str::to_string);
        state.position = Some(position);
        state
            .log
            .push(format!("char:{}@{}", portrait.unwrap_or("-"), position.as_str()));
    }

    fn begin_text_line(&mut self) {
        self.state.borrow_mut().lines.push(String::new());
    }

    fn append_text(&mut self, fragment: &str) {
        let mut state = self.state.borrow_mut();
        if state.lines.is_empty() {
            state.lines.push(String::new());
        }
        if let Some(line) = state.lines.last_mut() {
            line.push_str(fragment);
        }
    }

    fn clear_text(&mut self) {
        let mut state = self.state.borrow_mut();
        state.lines.clear();
        state.log.push("clear_text".to_string());
    }

    fn set_fade_opacity(&mut self, opacity: f32, duration_ms: u64) {
        let mut state = self.state.borrow_mut();
        state.fade_opacity = opacity;
        state.log.push(format!("fade:{opacity}/{duration_ms}"));
    }

    fn set_shake(&mut self, tier: Option<ShakeTier>) {
        let mut state = self.state.borrow_mut();
        state.shake = tier;
        if let Some(tier) = tier {
            state.log.push(format!("shake:{}", tier.class_name()));
        }
    }

    fn set_text_visible(&mut self, visible: bool) {
        let mut state = self.state.borrow_mut();
        state.text_visible = visible;
        state.log.push(format!("text_visible:{visible}"));
    }

    fn flush(&mut self) {
        self.state.borrow_mut().log.push("flush".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> (Stage, MemorySurface) {
        let surface = MemorySurface::new();
        (Stage::new(Box::new(surface.clone())), surface)
    }

    #[test]
    fn test_crossfade_order() {
        let (mut stage, surface) = stage();
        stage.set_background("old.png");
        surface.take_log();

        stage.begin_crossfade("new.png", 1000);
        assert_eq!(stage.background(), Some("old.png"));
        assert_eq!(stage.overlay(), Some("new.png"));

        stage.finish_crossfade();
        assert_eq!(stage.background(), Some("new.png"));
        assert_eq!(stage.overlay(), None);

        assert_eq!(
            surface.take_log(),
            vec![
                "overlay:new.png",
                "flush",
                "overlay_opacity:1/1000",
                "bg:new.png",
                "overlay_removed"
            ]
        );
    }

    #[test]
    fn test_character_position_inherits() {
        let (mut stage, surface) = stage();

        stage.set_character(Some("a.png"), None);
        assert_eq!(stage.position(), CharacterPosition::Center);

        stage.set_character(Some("a.png"), Some(CharacterPosition::Left));
        stage.set_character(Some("b.png"), None);
        assert_eq!(stage.position(), CharacterPosition::Left);
        assert_eq!(surface.state().character.as_deref(), Some("b.png"));

        stage.set_character(None, None);
        assert_eq!(stage.character(), None);
        assert_eq!(stage.position(), CharacterPosition::Left);
    }

    #[test]
    fn test_text_mirror_matches_surface() {
        let (mut stage, surface) = stage();
        stage.begin_line();
        stage.append("你");
        stage.append("好");
        stage.begin_line();
        stage.append("!");

        assert_eq!(stage.lines(), ["你好".to_string(), "!".to_string()]);
        assert_eq!(surface.text(), "你好\n!");

        stage.clear_text();
        assert!(stage.lines().is_empty());
        assert_eq!(surface.text(), "");
    }

    #[test]
    fn test_restore_and_reset() {
        let (mut stage, surface) = stage();
        stage.restore(
            Some("bg.png"),
            Some("c.png"),
            CharacterPosition::Right,
            &["一".to_string(), "二".to_string()],
        );
        assert_eq!(surface.state().background.as_deref(), Some("bg.png"));
        assert_eq!(surface.state().position, Some(CharacterPosition::Right));
        assert_eq!(surface.text(), "一\n二");

        stage.reset();
        assert_eq!(stage.character(), None);
        assert!(stage.lines().is_empty());
        assert_eq!(stage.fade_opacity(), 1.0);
        // 背景保留到下一次开始游戏
        assert_eq!(stage.background(), Some("bg.png"));
    }

    #[test]
    fn test_restore_without_background_clears_it() {
        let (mut stage, surface) = stage();
        stage.set_background("street.png");
        stage.begin_crossfade("night.png", 500);
        surface.take_log();

        stage.restore(None, None, CharacterPosition::Center, &[]);
        assert_eq!(stage.background(), None);
        assert_eq!(stage.overlay(), None);
        assert_eq!(surface.state().background, None);
        assert!(surface.take_log().contains(&"bg_cleared".to_string()));
    }
}
