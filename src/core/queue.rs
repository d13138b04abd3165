//! # Test Queue Module / 测试队列模块
//!
//! An ordered, mutable list of pending test descriptors. All mutating
//! operations are rejected while a run is consuming the queue; ordering is
//! stable except for explicit `reorder` calls, and descriptor ids are never
//! reused within a session.
//!
//! 一个有序、可变的待执行测试描述符列表。运行消费队列期间拒绝所有
//! 变更操作；除显式 `reorder` 外顺序保持稳定，描述符 id 在会话内绝不复用。

use std::collections::VecDeque;

use crate::core::models::{DescriptorId, EngineError, TestDescriptor, TestSpec};

/// FIFO of pending descriptors with a run-time write lock.
/// 带运行期写锁的待执行描述符 FIFO。
#[derive(Debug, Default)]
pub struct TestQueue {
    items: VecDeque<TestDescriptor>,
    next_id: u64,
    locked: bool,
}

impl TestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a test and assigns its session-unique id.
    /// 追加一个测试并分配其会话内唯一 id。
    pub fn add(&mut self, spec: TestSpec) -> Result<DescriptorId, EngineError> {
        self.ensure_unlocked("add")?;
        let id = DescriptorId(self.next_id);
        self.next_id += 1;
        self.items.push_back(TestDescriptor { id, spec });
        Ok(id)
    }

    /// Removes the descriptor with the given id.
    pub fn remove(&mut self, id: DescriptorId) -> Result<TestDescriptor, EngineError> {
        self.ensure_unlocked("remove")?;
        let pos = self
            .items
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| EngineError::QueueState(format!("no queued descriptor {id}")))?;
        Ok(self.items.remove(pos).expect("position was just found"))
    }

    /// Moves the descriptor with the given id to `new_index` (clamped to the
    /// queue length); every other descriptor keeps its relative order.
    ///
    /// 将给定 id 的描述符移动到 `new_index`（截断到队列长度）；
    /// 其它描述符保持相对顺序。
    pub fn reorder(&mut self, id: DescriptorId, new_index: usize) -> Result<(), EngineError> {
        self.ensure_unlocked("reorder")?;
        let pos = self
            .items
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| EngineError::QueueState(format!("no queued descriptor {id}")))?;
        let descriptor = self.items.remove(pos).expect("position was just found");
        let new_index = new_index.min(self.items.len());
        self.items.insert(new_index, descriptor);
        Ok(())
    }

    /// Drains every pending descriptor.
    pub fn clear(&mut self) -> Result<(), EngineError> {
        self.ensure_unlocked("clear")?;
        self.items.clear();
        Ok(())
    }

    /// The descriptor `pop_next` would return, without consuming it.
    pub fn peek_next(&self) -> Option<&TestDescriptor> {
        self.items.front()
    }

    /// Consumes the next descriptor in current order.
    /// 按当前顺序消费下一个描述符。
    pub fn pop_next(&mut self) -> Result<TestDescriptor, EngineError> {
        self.items.pop_front().ok_or(EngineError::EmptyQueue)
    }

    /// Removes and returns every pending descriptor, in order, regardless of
    /// the lock. Used by the run worker when a cancelled run records the
    /// remainder as skipped.
    pub fn drain(&mut self) -> Vec<TestDescriptor> {
        self.items.drain(..).collect()
    }

    /// A point-in-time copy of the pending descriptors, in order.
    pub fn snapshot(&self) -> Vec<TestDescriptor> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Flipped by the run controller for the duration of a run. While locked,
    /// every mutating operation fails with `EngineError::QueueState`.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn ensure_unlocked(&self, op: &str) -> Result<(), EngineError> {
        if self.locked {
            Err(EngineError::QueueState(format!(
                "'{op}' called while a run is active"
            )))
        } else {
            Ok(())
        }
    }
}
