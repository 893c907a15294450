//! # Directive 模块
//!
//! 场景脚本中的行指令定义，以及从场景文件 JSON 到指令的校验转换。
//!
//! ## 场景文件格式
//!
//! ```text
//! { "lines": [
//!     { "text": "……", "bg": "bg/room.png", "char": "ch/alice.png", "pos": "left" },
//!     { "clear": true },
//!     { "shake": 40 },
//!     { "audio": "se/door.ogg", "loops": 2 },
//!     { "stopAudio": true }
//! ] }
//! ```
//!
//! 每行只能属于一种指令。同时设置多个互斥字段在加载时即报错，
//! 不依赖隐式优先级决定执行哪一个。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ContentError, DirectiveError};

/// 角色立绘位置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterPosition {
    /// 左侧
    Left,
    /// 中央
    #[default]
    Center,
    /// 右侧
    Right,
}

impl CharacterPosition {
    /// 位置名称（与场景文件中的写法一致）
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

impl FromStr for CharacterPosition {
    type Err = ();

    /// 从字符串解析位置（不区分大小写）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" | "middle" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(()),
        }
    }
}

/// 立绘变更
///
/// 对话行未指定立绘时沿用当前立绘；显式的空字符串表示清除立绘。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortraitChange {
    /// 显示指定立绘
    Show(String),
    /// 清除立绘
    Clear,
}

/// 行指令
#[derive(Debug, Clone, PartialEq)]
pub enum LineDirective {
    /// 对话行，可附带背景和立绘变更
    Dialogue {
        text: String,
        background: Option<String>,
        character: Option<PortraitChange>,
        position: Option<CharacterPosition>,
    },
    /// 清空已显示的文本
    Clear,
    /// 震屏，强度 1..=100
    Shake { intensity: i64 },
    /// 播放音频，`loop_count = -1` 表示无限循环
    AudioPlay { path: String, loop_count: i64 },
    /// 停止音频
    AudioStop,
}

impl LineDirective {
    /// 创建只有文本的对话行
    pub fn dialogue(text: impl Into<String>) -> Self {
        Self::Dialogue {
            text: text.into(),
            background: None,
            character: None,
            position: None,
        }
    }

    /// 是否为瞬时指令（执行完后自动继续下一行，不等待用户输入）
    pub fn is_instantaneous(&self) -> bool {
        !matches!(self, Self::Dialogue { .. })
    }

    /// 对话文本（非对话行返回 None）
    pub fn dialogue_text(&self) -> Option<&str> {
        match self {
            Self::Dialogue { text, .. } => Some(text),
            _ => None,
        }
    }

    /// 指令名称（用于日志）
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Dialogue { .. } => "dialogue",
            Self::Clear => "clear",
            Self::Shake { .. } => "shake",
            Self::AudioPlay { .. } => "audio",
            Self::AudioStop => "stopAudio",
        }
    }
}

/// 场景文件中的一行（未校验）
#[derive(Debug, Default, Deserialize)]
struct RawLine {
    text: Option<String>,
    bg: Option<String>,
    #[serde(rename = "char")]
    character: Option<String>,
    pos: Option<String>,
    #[serde(default)]
    clear: bool,
    shake: Option<i64>,
    audio: Option<String>,
    loops: Option<i64>,
    #[serde(default, rename = "stopAudio")]
    stop_audio: bool,
}

impl RawLine {
    /// 校验并转换为指令
    ///
    /// `line` 为 1-based 行号，仅用于错误信息。
    fn into_directive(self, line: usize) -> Result<LineDirective, DirectiveError> {
        // 空路径视为未设置
        let bg = self.bg.filter(|s| !s.is_empty());
        let audio = self.audio.filter(|s| !s.is_empty());

        let has_dialogue_fields = self.text.is_some()
            || bg.is_some()
            || self.character.is_some()
            || self.pos.is_some();

        let mut tags = Vec::new();
        if has_dialogue_fields {
            tags.push("dialogue");
        }
        if self.clear {
            tags.push("clear");
        }
        if self.shake.is_some() {
            tags.push("shake");
        }
        if audio.is_some() {
            tags.push("audio");
        }
        if self.stop_audio {
            tags.push("stopAudio");
        }

        if tags.len() > 1 {
            return Err(DirectiveError::ConflictingTags { line, tags });
        }

        if self.loops.is_some() && audio.is_none() {
            return Err(DirectiveError::StrayField {
                line,
                field: "loops",
                tag: tags.first().copied().unwrap_or("dialogue"),
            });
        }

        if self.clear {
            return Ok(LineDirective::Clear);
        }

        if let Some(intensity) = self.shake {
            return Ok(LineDirective::Shake { intensity });
        }

        if let Some(path) = audio {
            let loop_count = self.loops.unwrap_or(1);
            if loop_count < -1 {
                return Err(DirectiveError::InvalidLoopCount {
                    line,
                    value: loop_count,
                });
            }
            return Ok(LineDirective::AudioPlay { path, loop_count });
        }

        if self.stop_audio {
            return Ok(LineDirective::AudioStop);
        }

        let position = match self.pos {
            Some(value) => Some(
                CharacterPosition::from_str(&value)
                    .map_err(|_| DirectiveError::InvalidPosition { line, value })?,
            ),
            None => None,
        };

        let character = self.character.map(|c| {
            if c.is_empty() {
                PortraitChange::Clear
            } else {
                PortraitChange::Show(c)
            }
        });

        Ok(LineDirective::Dialogue {
            text: self.text.unwrap_or_default(),
            background: bg,
            character,
            position,
        })
    }
}

/// 场景文件（未校验）
#[derive(Debug, Deserialize)]
struct RawScene {
    #[serde(default)]
    lines: Vec<RawLine>,
}

/// 场景脚本：一个场景文件中的全部行指令
#[derive(Debug, Clone, PartialEq)]
pub struct SceneScript {
    /// 场景文件标识
    pub file: String,
    /// 行指令列表
    pub lines: Vec<LineDirective>,
}

impl SceneScript {
    /// 创建场景脚本
    pub fn new(file: impl Into<String>, lines: Vec<LineDirective>) -> Self {
        Self {
            file: file.into(),
            lines,
        }
    }

    /// 从场景文件 JSON 解析
    pub fn parse(file: &str, json: &str) -> Result<Self, ContentError> {
        let raw: RawScene =
            serde_json::from_str(json).map_err(|e| ContentError::SceneUnparseable {
                file: file.to_string(),
                message: e.to_string(),
            })?;

        let lines = raw
            .lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| line.into_directive(i + 1))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| ContentError::InvalidDirective {
                file: file.to_string(),
                source,
            })?;

        Ok(Self::new(file, lines))
    }

    /// 获取指定行
    pub fn get(&self, index: usize) -> Option<&LineDirective> {
        self.lines.get(index)
    }

    /// 行数
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// 是否为空场景
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
