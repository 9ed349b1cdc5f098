// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

mod backtrace_rs;
mod frame_pointer;

pub(crate) use backtrace_rs::trace_current;
pub(crate) use frame_pointer::walk_task;

/// Why a suspended task's saved stack could not be walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StackFault {
    #[error("stack word at {0:#x} is unreadable")]
    Unreadable(usize),
    #[error("frame pointer {0:#x} is misaligned")]
    Misaligned(usize),
    #[error("frame pointer {fp:#x} is below {floor:#x}")]
    NotMonotonic { fp: usize, floor: usize },
}
