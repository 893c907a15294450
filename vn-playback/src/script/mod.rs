//! # Script 模块
//!
//! 场景内容相关功能：行指令、场景索引、脚本仓库。
//!
//! ## 模块结构
//!
//! - [`directive`]：行指令定义和场景文件校验
//! - [`index`]：章节 → 场景文件索引
//! - [`repository`]：脚本仓库抽象

pub mod directive;
pub mod index;
pub mod repository;

pub use directive::{CharacterPosition, LineDirective, PortraitChange, SceneScript};
pub use index::{ChapterKey, SceneCoordinate, SceneIndex};
pub use repository::{MemoryRepository, ScriptRepository};
