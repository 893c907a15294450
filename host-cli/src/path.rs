//! # 路径规范化模块
//!
//! 场景文件、背景图片和音频都以**相对于 assets_root 的逻辑路径**引用，
//! 使用 `/` 分隔符。本模块把逻辑路径规范化，并解析到实际文件路径。

use std::path::{Path, PathBuf};

/// 规范化逻辑路径
///
/// - 统一使用 `/` 分隔符
/// - 跳过空组件和 `.`
/// - `..` 只回退已有组件，不会越出资源根目录
///
/// ```
/// use host_cli::path::normalize_logical_path;
///
/// assert_eq!(normalize_logical_path("./bg/../bg/room.png"), "bg/room.png");
/// assert_eq!(normalize_logical_path("..\\..\\se\\door.ogg"), "se/door.ogg");
/// ```
pub fn normalize_logical_path(path: &str) -> String {
    let unified = path.replace('\\', "/");

    let mut components = Vec::new();
    for component in unified.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            _ => components.push(component),
        }
    }

    components.join("/")
}

/// 把逻辑路径解析到资源根目录下的实际路径
pub fn resolve(root: &Path, logical_path: &str) -> PathBuf {
    root.join(normalize_logical_path(logical_path))
}

/// 实际路径转为逻辑路径（不在根目录下时返回 None）
pub fn to_logical(root: &Path, full_path: &Path) -> Option<String> {
    full_path
        .strip_prefix(root)
        .ok()
        .map(|relative| relative.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_logical_path("01_001.json"), "01_001.json");
        assert_eq!(normalize_logical_path("scenes//01/./a.json"), "scenes/01/a.json");
        assert_eq!(normalize_logical_path("../../etc/passwd"), "etc/passwd");
        assert_eq!(normalize_logical_path(""), "");
    }

    #[test]
    fn test_resolve_and_back() {
        let root = Path::new("/game/assets");
        let full = resolve(root, "bg\\room.png");
        assert_eq!(full, PathBuf::from("/game/assets/bg/room.png"));
        assert_eq!(to_logical(root, &full).as_deref(), Some("bg/room.png"));
        assert_eq!(to_logical(root, Path::new("/elsewhere/x.png")), None);
    }
}
