//! # Commands 模块
//!
//! 交互模式下从标准输入读取的命令。
//!
//! | 输入 | 含义 |
//! |------|------|
//! | 空行 | 推进（标题画面上为开始游戏） |
//! | `a` / `s` / `h` | 切换自动 / 快进 / 隐藏文本框 |
//! | `save N` / `load N` / `del N` | 存档 / 读档 / 删除槽位 |
//! | `slots` | 列出槽位 |
//! | `speed MS` | 设置自动播放间隔 |
//! | `menu` | 回到标题 |
//! | `q` | 退出 |

use std::str::FromStr;

use thiserror::Error;
use vn_playback::Input;

/// 命令解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("未知命令: {0}")]
    Unknown(String),

    #[error("命令 {command} 需要一个数字参数")]
    MissingArgument { command: &'static str },

    #[error("无效的数字: {0}")]
    InvalidNumber(String),
}

/// 交互命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 推进或开始游戏
    Advance,
    /// 直接转发给引擎的输入
    Input(Input),
    /// 列出槽位
    Slots,
    /// 帮助
    Help,
    /// 退出程序
    Quit,
}

/// 解析一行输入
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(Command::Advance);
    };
    let arg = parts.next();

    let command = match head {
        "a" | "auto" => Command::Input(Input::ToggleAuto),
        "s" | "skip" => Command::Input(Input::ToggleSkip),
        "h" | "hide" => Command::Input(Input::ToggleHidden),
        "save" => Command::Input(Input::SaveToSlot(number(arg, "save")?)),
        "load" => Command::Input(Input::LoadFromSlot(number(arg, "load")?)),
        "del" => Command::Input(Input::DeleteSlot(number(arg, "del")?)),
        "speed" => Command::Input(Input::AdjustAutoSpeed(number(arg, "speed")?)),
        "menu" => Command::Input(Input::ExitToMenu),
        "slots" => Command::Slots,
        "help" | "?" => Command::Help,
        "q" | "quit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn number<T: FromStr>(arg: Option<&str>, command: &'static str) -> Result<T, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument { command })?;
    arg.parse()
        .map_err(|_| CommandError::InvalidNumber(arg.to_string()))
}

/// 帮助文本
pub const HELP: &str = "\
回车        推进 / 开始游戏
a / s / h   自动 / 快进 / 隐藏文本框
save N      存档到槽位 N
load N      读取槽位 N
del N       删除槽位 N
slots       列出槽位
speed MS    设置自动播放间隔（毫秒）
menu        回到标题
q           退出";
