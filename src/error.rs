// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

use crate::task::TaskStatus;
use crate::unwind::StackFault;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("debug-info backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("capture session is closed")]
    SessionClosed,
    #[error("task {task} is not suspended (status: {status:?})")]
    TaskNotSuspended { task: u64, status: TaskStatus },
    #[error("task {0} has no saved stack state")]
    StackUnavailable(u64),
    #[error("saved stack of task {task} is inconsistent: {fault}")]
    InconsistentStack { task: u64, fault: StackFault },
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
