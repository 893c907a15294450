//! # Scheduler 模块
//!
//! 单线程虚拟时间定时器队列。
//!
//! 所有的"等待一段时间后继续"（打字间隔、过渡动画时长、自动播放延迟）
//! 都以定时任务的形式排入队列。宿主负责推进时间：
//!
//! ```text
//! Host                              Session
//!   │── advance_time(dt) ─────────────►│
//!   │                                  │ 依次触发所有到期任务
//!   │◄── next_timer_due() ─────────────│
//! ```
//!
//! 测试可以直接跳到下一个到期时间，不依赖真实时钟。

use std::collections::BTreeMap;

/// 定时任务句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId {
    due_ms: u64,
    seq: u64,
}

impl TimerId {
    /// 到期时间（虚拟毫秒）
    pub fn due_ms(&self) -> u64 {
        self.due_ms
    }
}

/// 虚拟时间定时器队列
///
/// 到期时间相同的任务按加入顺序触发。
#[derive(Debug)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_seq: u64,
    timers: BTreeMap<TimerId, T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// 创建空队列，时间从 0 开始
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            timers: BTreeMap::new(),
        }
    }

    /// 当前虚拟时间
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// 在 `delay_ms` 毫秒后触发任务
    pub fn schedule(&mut self, delay_ms: u64, task: T) -> TimerId {
        let id = TimerId {
            due_ms: self.now_ms.saturating_add(delay_ms),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.timers.insert(id, task);
        id
    }

    /// 取消任务，返回是否确实取消了未触发的任务
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    /// 取消所有任务
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// 下一个任务的到期时间
    pub fn next_due(&self) -> Option<u64> {
        self.timers.keys().next().map(TimerId::due_ms)
    }

    /// 是否还有待触发的任务
    pub fn is_idle(&self) -> bool {
        self.timers.is_empty()
    }

    /// 待触发任务数量
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// 取出下一个不晚于 `until_ms` 到期的任务，并把当前时间推进到它的到期时间
    pub fn pop_due(&mut self, until_ms: u64) -> Option<T> {
        let id = *self.timers.keys().next()?;
        if id.due_ms > until_ms {
            return None;
        }
        self.now_ms = self.now_ms.max(id.due_ms);
        self.timers.remove(&id)
    }

    /// 把当前时间推进到 `target_ms`（不会倒退）
    pub fn advance_to(&mut self, target_ms: u64) {
        self.now_ms = self.now_ms.max(target_ms);
    }
}
