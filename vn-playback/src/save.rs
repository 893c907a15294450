//! # Save 模块
//!
//! 存档槽位和用户偏好的持久化。
//!
//! ## 设计原则
//!
//! - 存档数据必须可序列化（JSON），并带版本号
//! - 只保存恢复所需的最小游标字段和一份渲染摘要，不回放之前的行
//! - 存储失败以 `false` / `None` 返回，不向调用方抛出错误
//! - 写入失败时旧的槽位内容保持不变
//!
//! 键值存储由宿主实现 [`KeyValueStore`]，存档使用 `vnSave_<n>` 键，
//! 自动播放间隔使用 `autoSpeed` 键。

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StorageError;
use crate::script::CharacterPosition;
use crate::state::CursorSnapshot;

/// 存档格式版本
///
/// 版本号含义：
/// - MAJOR: 不兼容的格式变更
/// - MINOR: 向后兼容的新字段
pub const SAVE_VERSION_MAJOR: u32 = 1;
pub const SAVE_VERSION_MINOR: u32 = 0;

/// 存档键前缀
pub const SAVE_KEY_PREFIX: &str = "vnSave_";

/// 自动播放间隔的偏好键
pub const AUTO_SPEED_KEY: &str = "autoSpeed";

/// 槽位列表中预览文本的最大字符数
pub const PREVIEW_MAX_CHARS: usize = 50;

/// 没有可用预览文本时的占位
pub const DEFAULT_PREVIEW: &str = "游戏进行中";

/// 存档版本信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveVersion {
    pub major: u32,
    pub minor: u32,
}

impl SaveVersion {
    /// 当前版本
    pub fn current() -> Self {
        Self {
            major: SAVE_VERSION_MAJOR,
            minor: SAVE_VERSION_MINOR,
        }
    }

    /// 检查是否兼容（major 必须相同）
    pub fn is_compatible(&self) -> bool {
        self.major == SAVE_VERSION_MAJOR
    }
}

impl std::fmt::Display for SaveVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Default for SaveVersion {
    fn default() -> Self {
        Self::current()
    }
}

/// 渲染摘要
///
/// 读档时原样恢复，保证画面连续。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderSummary {
    pub background: Option<String>,
    pub character: Option<String>,
    #[serde(default)]
    pub position: CharacterPosition,
    /// 文本区中的各行文本
    #[serde(default)]
    pub rendered_text: Vec<String>,
    /// 槽位列表中显示的预览文本
    #[serde(default)]
    pub preview_text: String,
}

/// 存档槽位数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSlot {
    #[serde(default)]
    pub version: SaveVersion,
    /// 保存时间（Unix 毫秒）
    pub created_at: i64,
    pub cursor: CursorSnapshot,
    pub render: RenderSummary,
}

impl SaveSlot {
    /// 以当前时间创建存档
    pub fn new(cursor: CursorSnapshot, render: RenderSummary) -> Self {
        Self {
            version: SaveVersion::current(),
            created_at: Utc::now().timestamp_millis(),
            cursor,
            render,
        }
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// 从 JSON 字符串反序列化，并检查版本兼容性
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let slot: SaveSlot =
            serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;

        if !slot.version.is_compatible() {
            return Err(StorageError::IncompatibleVersion {
                found: slot.version.to_string(),
                current: SaveVersion::current().to_string(),
            });
        }

        Ok(slot)
    }
}

/// 槽位列表信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSummary {
    pub slot: u32,
    pub created_at: i64,
    pub preview_text: String,
}

impl SlotSummary {
    /// 截断后的预览文本
    pub fn short_preview(&self) -> String {
        truncate_preview(&self.preview_text, PREVIEW_MAX_CHARS)
    }

    /// 本地时间 `YYYY-MM-DD HH:MM`
    pub fn formatted_time(&self) -> String {
        format_timestamp(self.created_at)
    }
}

/// 截断文本，超出部分以 `...` 代替
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars).collect();
    short.push_str("...");
    short
}

/// 把 Unix 毫秒格式化为本地时间 `YYYY-MM-DD HH:MM`
pub fn format_timestamp(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => String::new(),
    }
}

/// 持久化键值存储
pub trait KeyValueStore {
    /// 读取，键不存在时返回 `Ok(None)`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// 写入（覆盖）
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 删除，键不存在时也视为成功
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    entries: BTreeMap<String, String>,
    read_only: bool,
    broken_keys: HashSet<String>,
}

/// 内存键值存储
///
/// 克隆的句柄共享同一份数据，可以模拟写入失败。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryStoreInner>>,
}

impl MemoryStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置为只读（之后所有写入和删除都失败）
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.borrow_mut().read_only = read_only;
    }

    /// 让指定键的读取失败
    pub fn break_key(&self, key: impl Into<String>) {
        self.inner.borrow_mut().broken_keys.insert(key.into());
    }

    /// 直接写入原始内容
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.borrow_mut().entries.insert(key.into(), value.into());
    }

    /// 读取原始内容
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.borrow().entries.get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let inner = self.inner.borrow();
        if inner.broken_keys.contains(key) {
            return Err(StorageError::ReadFailed {
                key: key.to_string(),
                message: "读取被拒绝".to_string(),
            });
        }
        Ok(inner.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.borrow_mut();
        if inner.read_only {
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                message: "存储只读".to_string(),
            });
        }
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.borrow_mut();
        if inner.read_only {
            return Err(StorageError::RemoveFailed {
                key: key.to_string(),
                message: "存储只读".to_string(),
            });
        }
        inner.entries.remove(key);
        Ok(())
    }
}

/// 存档管理
pub struct SnapshotStore {
    store: Box<dyn KeyValueStore>,
    max_slots: u32,
}

impl SnapshotStore {
    /// 创建存档管理器，槽位范围为 `1..=max_slots`
    pub fn new(store: Box<dyn KeyValueStore>, max_slots: u32) -> Self {
        Self { store, max_slots }
    }

    /// 槽位数量
    pub fn max_slots(&self) -> u32 {
        self.max_slots
    }

    fn slot_key(&self, slot: u32) -> Result<String, StorageError> {
        if slot == 0 || slot > self.max_slots {
            return Err(StorageError::SlotOutOfRange {
                slot,
                max: self.max_slots,
            });
        }
        Ok(format!("{SAVE_KEY_PREFIX}{slot}"))
    }

    fn try_save(&mut self, slot: u32, data: &SaveSlot) -> Result<(), StorageError> {
        let key = self.slot_key(slot)?;
        let json = data.to_json()?;
        self.store.set(&key, &json)
    }

    fn try_load(&self, slot: u32) -> Result<Option<SaveSlot>, StorageError> {
        let key = self.slot_key(slot)?;
        match self.store.get(&key)? {
            Some(json) => SaveSlot::from_json(&json).map(Some),
            None => Ok(None),
        }
    }

    /// 保存到槽位，覆盖原有内容
    pub fn save(&mut self, slot: u32, data: &SaveSlot) -> bool {
        match self.try_save(slot, data) {
            Ok(()) => {
                info!(slot, chapter = %data.cursor.chapter, "存档完成");
                true
            }
            Err(e) => {
                warn!(slot, error = %e, "存档失败");
                false
            }
        }
    }

    /// 读取槽位，空槽位或数据损坏时返回 `None`
    pub fn load(&self, slot: u32) -> Option<SaveSlot> {
        match self.try_load(slot) {
            Ok(data) => data,
            Err(e) => {
                warn!(slot, error = %e, "读取存档失败");
                None
            }
        }
    }

    /// 槽位列表信息
    pub fn describe(&self, slot: u32) -> Option<SlotSummary> {
        let data = self.load(slot)?;
        let preview_text = if data.render.preview_text.is_empty() {
            DEFAULT_PREVIEW.to_string()
        } else {
            data.render.preview_text
        };
        Some(SlotSummary {
            slot,
            created_at: data.created_at,
            preview_text,
        })
    }

    /// 删除槽位
    pub fn delete(&mut self, slot: u32) -> bool {
        let result = self
            .slot_key(slot)
            .and_then(|key| self.store.remove(&key));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(slot, error = %e, "删除存档失败");
                false
            }
        }
    }

    /// 读取保存的自动播放间隔
    pub fn auto_speed(&self) -> Option<u64> {
        match self.store.get(AUTO_SPEED_KEY) {
            Ok(value) => value.and_then(|v| v.trim().parse().ok()),
            Err(e) => {
                warn!(error = %e, "读取自动播放间隔失败");
                None
            }
        }
    }

    /// 保存自动播放间隔
    pub fn set_auto_speed(&mut self, delay_ms: u64) -> bool {
        match self.store.set(AUTO_SPEED_KEY, &delay_ms.to_string()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "保存自动播放间隔失败");
                false
            }
        }
    }
}
