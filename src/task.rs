// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

use std::mem::size_of;

/// Scheduling status of a runtime task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Suspended,
    Finished,
}

/// Registers saved when a task was switched out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedRegisters {
    pub pc: usize,
    pub sp: usize,
    pub fp: usize,
}

/// A lightweight task owned by the managed runtime.
///
/// The runtime must keep the task quiesced for the duration of a
/// [`Session::capture_suspended`](crate::Session::capture_suspended) call.
/// The status check done there is a consistency guard, not a lock.
pub trait Task {
    fn id(&self) -> u64;

    fn status(&self) -> TaskStatus;

    /// `None` when the task never ran or has already been torn down.
    fn saved_registers(&self) -> Option<SavedRegisters>;

    /// Reads one machine word of the task's stack, or `None` if `addr` lies
    /// outside it.
    fn read_word(&self, addr: usize) -> Option<usize>;
}

/// An owned copy of a task stack region `[base, base + len * word)`.
#[derive(Debug, Clone)]
pub struct StackImage {
    id: u64,
    status: TaskStatus,
    regs: Option<SavedRegisters>,
    base: usize,
    words: Vec<usize>,
}

impl StackImage {
    pub fn new(id: u64, base: usize, words: Vec<usize>) -> Self {
        StackImage {
            id,
            status: TaskStatus::Suspended,
            regs: None,
            base,
            words,
        }
    }

    pub fn with_registers(mut self, regs: SavedRegisters) -> Self {
        self.regs = Some(regs);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// One past the highest address covered by the image, saturating at the
    /// top of the address space.
    pub fn end(&self) -> usize {
        self.words
            .len()
            .checked_mul(size_of::<usize>())
            .map_or(usize::MAX, |len| self.base.saturating_add(len))
    }
}

impl Task for StackImage {
    fn id(&self) -> u64 {
        self.id
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn saved_registers(&self) -> Option<SavedRegisters> {
        self.regs
    }

    fn read_word(&self, addr: usize) -> Option<usize> {
        let offset = addr.checked_sub(self.base)?;
        if offset % size_of::<usize>() != 0 {
            return None;
        }
        self.words.get(offset / size_of::<usize>()).copied()
    }
}
