//! # Background 模块
//!
//! 背景切换：预加载 → 透明叠加层 → 不透明度动画 → 换入底层。
//!
//! 旧背景在整个过渡期间保持显示，不会突然消失。
//! 预加载失败时退化为无动画的直接替换，并把错误交给调用方上报。

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::{AssetError, AssetKind};
use crate::stage::Stage;

/// 图片加载器
pub trait ImageLoader {
    /// 预加载图片，确认可用
    fn preload(&mut self, reference: &str) -> Result<(), AssetError>;
}

/// 背景切换结果
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// 与当前背景相同，什么都不做
    Unchanged,
    /// 交叉淡化进行中，等待 `duration_ms` 后调用 [`BackgroundTransitioner::finish`]
    Crossfade { duration_ms: u64 },
    /// 预加载失败，已直接替换
    HardSwap(AssetError),
}

/// 背景切换器
///
/// 预加载成功的图片在会话期间缓存，回到标题时清空。
pub struct BackgroundTransitioner {
    loader: Box<dyn ImageLoader>,
    preloaded: HashSet<String>,
}

impl BackgroundTransitioner {
    /// 创建背景切换器
    pub fn new(loader: Box<dyn ImageLoader>) -> Self {
        Self {
            loader,
            preloaded: HashSet::new(),
        }
    }

    /// 切换到新背景
    pub fn transition_to(&mut self, stage: &mut Stage, reference: &str, duration_ms: u64) -> Transition {
        if stage.background() == Some(reference) {
            return Transition::Unchanged;
        }

        if !self.preloaded.contains(reference) {
            if let Err(e) = self.loader.preload(reference) {
                warn!(background = %reference, error = %e, "背景预加载失败，直接替换");
                stage.set_background(reference);
                return Transition::HardSwap(e);
            }
            self.preloaded.insert(reference.to_string());
        }

        debug!(background = %reference, duration_ms, "背景交叉淡化");
        stage.begin_crossfade(reference, duration_ms);
        Transition::Crossfade { duration_ms }
    }

    /// 过渡动画结束
    pub fn finish(&mut self, stage: &mut Stage) {
        stage.finish_crossfade();
    }

    /// 是否已缓存
    pub fn is_preloaded(&self, reference: &str) -> bool {
        self.preloaded.contains(reference)
    }

    /// 清空预加载缓存
    pub fn clear_cache(&mut self) {
        self.preloaded.clear();
    }
}

/// 内存图片加载器
///
/// 除了标记为缺失的图片，其余都视为可用。克隆的句柄共享加载记录。
#[derive(Debug, Clone, Default)]
pub struct MemoryImages {
    missing: Rc<RefCell<HashSet<String>>>,
    loads: Rc<RefCell<Vec<String>>>,
}

impl MemoryImages {
    /// 创建加载器
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记图片缺失
    pub fn with_missing(self, reference: impl Into<String>) -> Self {
        self.missing.borrow_mut().insert(reference.into());
        self
    }

    /// 已执行的预加载
    pub fn loads(&self) -> Vec<String> {
        self.loads.borrow().clone()
    }
}

impl ImageLoader for MemoryImages {
    fn preload(&mut self, reference: &str) -> Result<(), AssetError> {
        self.loads.borrow_mut().push(reference.to_string());
        if self.missing.borrow().contains(reference) {
            return Err(AssetError::LoadFailed {
                kind: AssetKind::Image,
                path: reference.to_string(),
                message: "文件不存在".to_string(),
            });
        }
        Ok(())
    }
}
