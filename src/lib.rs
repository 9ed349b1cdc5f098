// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

//! Session-based backtrace capture.
//!
//! A [`Session`] wraps the debug-info resolution context of the running
//! process. It captures backtraces of the calling thread
//! ([`Session::capture_current`]) or of a suspended runtime task
//! ([`Session::capture_suspended`]). Every capture returns an independently
//! owned [`Backtrace`] whose frames live in a chain of fixed-capacity chunks.
//!
//! ```no_run
//! let session = taskbt::Session::open().unwrap();
//! let bt = session.capture_current().unwrap();
//! bt.print(std::io::stderr()).unwrap();
//! bt.release();
//! session.close();
//! ```

/// Number of frames held by a single [`FrameChunk`].
pub const CHUNK_CAPACITY: usize = 256;

cfg_if::cfg_if! {
    if #[cfg(feature = "huge-depth")] {
        /// Default upper bound on the number of frames walked per capture.
        pub const MAX_DEPTH: usize = 65536;
    } else if #[cfg(feature = "large-depth")] {
        /// Default upper bound on the number of frames walked per capture.
        pub const MAX_DEPTH: usize = 8192;
    } else {
        /// Default upper bound on the number of frames walked per capture.
        pub const MAX_DEPTH: usize = 1024;
    }
}

mod chunk;
mod error;
mod frames;
mod resolve;
mod session;
mod task;
mod trace;
mod unwind;

pub use chunk::{Chunks, FrameChain, FrameChunk, FramesIter};
pub use error::{Error, Result};
pub use frames::Frame;
pub use resolve::{DebugInfoResolver, Module, Resolve, Symbol, SymbolCache};
pub use session::{Session, SessionBuilder, SessionState};
pub use task::{SavedRegisters, StackImage, Task, TaskStatus};
pub use trace::Backtrace;
pub use unwind::StackFault;
