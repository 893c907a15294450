//! # Typewriter 模块
//!
//! 逐字显示文本，按标点调整节奏。
//!
//! 打字机本身不计时：每次 [`Typewriter::step`] 返回一个字符和显示下一个字符前应等待的时长，
//! 由会话把下一步排入定时器队列。
//!
//! ```text
//! start("好。")  ─► step() = Char('好', base)
//!                ─► step() = Char('。', base * 3)
//!                ─► step() = Done
//! ```
//!
//! 取消标志在下一步生效：剩余文本一次性写出并结束。

/// 单步结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeStep {
    /// 写出一个字符，等待 `delay_ms` 后再进行下一步
    Char { ch: char, delay_ms: u64 },
    /// 已取消：一次性写出剩余文本，显示结束
    Flush(String),
    /// 显示结束
    Done,
}

/// 字符显示后的停顿时长
///
/// 句末标点三倍，逗号两倍。
pub fn char_delay(ch: char, base_ms: u64) -> u64 {
    match ch {
        '.' | '!' | '?' | '…' | '。' => base_ms.saturating_mul(3),
        ',' | '、' | '，' => base_ms.saturating_mul(2),
        _ => base_ms,
    }
}

/// 打字机
#[derive(Debug, Clone, Default)]
pub struct Typewriter {
    chars: Vec<char>,
    next: usize,
    cancel_requested: bool,
    active: bool,
    base_ms: u64,
}

impl Typewriter {
    /// 创建打字机
    pub fn new(base_ms: u64) -> Self {
        Self {
            base_ms,
            ..Default::default()
        }
    }

    /// 开始显示新文本
    ///
    /// 清除上一行残留的取消标志。文本为空或只有空白时返回 `false`，表示无需显示。
    pub fn start(&mut self, text: &str) -> bool {
        self.cancel_requested = false;
        self.next = 0;
        if text.trim().is_empty() {
            self.chars.clear();
            self.active = false;
            return false;
        }
        self.chars = text.chars().collect();
        self.active = true;
        true
    }

    /// 请求取消（下一步时生效）
    pub fn cancel(&mut self) {
        if self.active {
            self.cancel_requested = true;
        }
    }

    /// 是否正在显示
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 是否已请求取消
    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    /// 立即结束，不写出剩余文本
    pub fn abort(&mut self) {
        self.chars.clear();
        self.next = 0;
        self.active = false;
        self.cancel_requested = false;
    }

    /// 推进一步
    pub fn step(&mut self) -> TypeStep {
        if !self.active {
            return TypeStep::Done;
        }

        if self.cancel_requested {
            let rest: String = self.chars[self.next..].iter().collect();
            self.abort();
            return TypeStep::Flush(rest);
        }

        match self.chars.get(self.next).copied() {
            Some(ch) => {
                self.next += 1;
                TypeStep::Char {
                    ch,
                    delay_ms: char_delay(ch, self.base_ms),
                }
            }
            None => {
                self.abort();
                TypeStep::Done
            }
        }
    }
}
