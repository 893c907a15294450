//! # Host CLI
//!
//! `vn-playback` 的终端宿主：为播放核心提供文件系统和终端实现。
//!
//! - [`config`]：宿主配置
//! - [`path`]：逻辑路径规范化
//! - [`fs_repository`]：从资源目录读取场景索引和场景文件
//! - [`fs_store`]：每个键一个 JSON 文件的持久化存储
//! - [`terminal`]：终端渲染表面、图片预加载、静音音频后端
//! - [`check`]：资源目录校验
//! - [`commands`]：交互命令解析

pub mod check;
pub mod commands;
pub mod config;
pub mod fs_repository;
pub mod fs_store;
pub mod path;
pub mod terminal;

pub use config::AppConfig;
pub use fs_repository::FsRepository;
pub use fs_store::FsStore;
pub use terminal::{FsImageLoader, SilentAudio, TerminalSurface};
