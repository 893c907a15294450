//! # Check 模块
//!
//! 资源目录校验：解析场景索引和所有场景文件，检查引用的资源是否存在。
//!
//! 错误（索引无法读取、场景缺失或无法解析）会导致播放时跳过场景；
//! 警告（资源缺失、未被索引的场景文件）只会让播放降级。

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;
use vn_playback::{LineDirective, PortraitChange, ScriptRepository};
use walkdir::WalkDir;

use crate::fs_repository::FsRepository;
use crate::path::{normalize_logical_path, resolve, to_logical};

/// 问题严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// 一条校验问题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIssue {
    pub severity: Severity,
    /// 相关文件（逻辑路径）
    pub file: String,
    pub message: String,
}

impl fmt::Display for CheckIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Warning => "警告",
            Severity::Error => "错误",
        };
        write!(f, "[{label}] {}: {}", self.file, self.message)
    }
}

/// 校验报告
#[derive(Debug, Default)]
pub struct CheckReport {
    pub chapters: usize,
    pub scenes: usize,
    pub lines: usize,
    pub issues: Vec<CheckIssue>,
}

impl CheckReport {
    /// 错误数量
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
            .count()
    }

    /// 是否没有错误
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    fn push(&mut self, severity: Severity, file: &str, message: impl Into<String>) {
        self.issues.push(CheckIssue {
            severity,
            file: file.to_string(),
            message: message.into(),
        });
    }
}

/// 校验资源目录
pub fn check_assets(repository: &FsRepository, index_file: &str) -> CheckReport {
    let mut report = CheckReport::default();

    let index = match repository.scene_index() {
        Ok(index) => index,
        Err(e) => {
            report.push(Severity::Error, index_file, e.to_string());
            return report;
        }
    };
    report.chapters = index.len();

    let mut indexed = BTreeSet::new();
    for (chapter, files) in index.chapters() {
        if files.is_empty() {
            report.push(Severity::Warning, index_file, format!("章节 {chapter} 没有场景"));
        }
        for file in files {
            indexed.insert(normalize_logical_path(file));
            check_scene(repository, file, &mut report);
        }
    }

    for orphan in unindexed_scenes(repository, index_file, &indexed) {
        report.push(Severity::Warning, &orphan, "场景文件未出现在索引中");
    }

    report
}

fn check_scene(repository: &FsRepository, file: &str, report: &mut CheckReport) {
    let script = match repository.scene_script(file) {
        Ok(script) => script,
        Err(e) => {
            report.push(Severity::Error, file, e.to_string());
            return;
        }
    };
    debug!(file, lines = script.len(), "场景校验通过");
    report.scenes += 1;
    report.lines += script.len();

    for (i, line) in script.lines.iter().enumerate() {
        for asset in referenced_assets(line) {
            if !resolve(repository.root(), asset).is_file() {
                report.push(
                    Severity::Warning,
                    file,
                    format!("第 {} 行引用的资源不存在: {asset}", i + 1),
                );
            }
        }
    }
}

fn referenced_assets(line: &LineDirective) -> Vec<&str> {
    match line {
        LineDirective::Dialogue {
            background,
            character,
            ..
        } => {
            let mut assets = Vec::new();
            if let Some(bg) = background {
                assets.push(bg.as_str());
            }
            if let Some(PortraitChange::Show(portrait)) = character {
                assets.push(portrait.as_str());
            }
            assets
        }
        LineDirective::AudioPlay { path, .. } => vec![path.as_str()],
        _ => Vec::new(),
    }
}

/// 资源目录下不在索引中的场景文件
///
/// 只把形如 `{ "lines": [...] }` 的 JSON 文件视为场景文件。
fn unindexed_scenes(
    repository: &FsRepository,
    index_file: &str,
    indexed: &BTreeSet<String>,
) -> Vec<String> {
    let index_file = normalize_logical_path(index_file);
    let root = repository.root();

    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .filter_map(|entry| to_logical(root, entry.path()))
        .filter(|logical| *logical != index_file && !indexed.contains(logical))
        .filter(|logical| looks_like_scene(&resolve(root, logical)))
        .collect()
}

fn looks_like_scene(path: &std::path::Path) -> bool {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
        .is_some_and(|value| value.get("lines").is_some_and(|lines| lines.is_array()))
}
