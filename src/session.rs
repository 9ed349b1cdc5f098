// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

use libc::c_void;
use spin::Mutex;

use crate::chunk::FrameChain;
use crate::error::{Error, Result};
use crate::frames::Frame;
use crate::resolve::{DebugInfoResolver, Resolve, SymbolCache};
use crate::task::{Task, TaskStatus};
use crate::trace::Backtrace;
use crate::unwind::{trace_current, walk_task};
use crate::MAX_DEPTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

struct Context<R> {
    resolver: R,
    cache: SymbolCache,
}

impl<R: Resolve> Context<R> {
    /// `lookup` differs from `address` for return addresses, which point one
    /// past the call instruction.
    fn frame(&mut self, address: usize, lookup: usize, resolve_symbols: bool) -> Frame {
        if resolve_symbols {
            self.cache.frame(&mut self.resolver, address, lookup)
        } else {
            Frame::unresolved(address)
        }
    }
}

/// Configuration for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    max_depth: usize,
    resolve_symbols: bool,
}

impl Default for SessionBuilder {
    fn default() -> SessionBuilder {
        SessionBuilder {
            max_depth: MAX_DEPTH,
            resolve_symbols: true,
        }
    }
}

impl SessionBuilder {
    /// Upper bound on the frames walked per capture. Deeper stacks are
    /// truncated. At least one frame is always kept.
    pub fn max_depth(self, max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
            ..self
        }
    }

    /// When disabled, frames carry addresses only.
    pub fn resolve_symbols(self, resolve_symbols: bool) -> Self {
        Self {
            resolve_symbols,
            ..self
        }
    }

    /// Opens a session backed by the debug info of the running process.
    pub fn open(self) -> Result<Session<DebugInfoResolver>> {
        match DebugInfoResolver::new() {
            Ok(resolver) => Ok(self.open_with(resolver)),
            Err(err) => {
                log::error!("error in opening capture session: {}", err);
                Err(err)
            }
        }
    }

    /// Opens a session backed by a caller-provided resolver.
    pub fn open_with<R: Resolve>(self, resolver: R) -> Session<R> {
        log::info!(
            "opening capture session (max depth {}, symbols {})",
            self.max_depth,
            self.resolve_symbols
        );
        Session {
            context: Mutex::new(Some(Context {
                resolver,
                cache: SymbolCache::new(),
            })),
            max_depth: self.max_depth,
            resolve_symbols: self.resolve_symbols,
        }
    }
}

/// A long-lived capture context.
///
/// The session owns the address resolver and its caches; every capture made
/// through it reuses them. Stack walks run unlocked, but symbol resolution is
/// serialized through a spin lock, so concurrent captures busy-wait while one
/// of them resolves (the first capture may load debug info).
/// Once closed, a session rejects captures with [`Error::SessionClosed`].
pub struct Session<R = DebugInfoResolver> {
    context: Mutex<Option<Context<R>>>,
    max_depth: usize,
    resolve_symbols: bool,
}

impl Session {
    pub fn open() -> Result<Session> {
        SessionBuilder::default().open()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }
}

impl<R: Resolve> Session<R> {
    pub fn state(&self) -> SessionState {
        if self.context.lock().is_some() {
            SessionState::Open
        } else {
            SessionState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of addresses memoized by the resolver cache.
    pub fn cached_addresses(&self) -> usize {
        self.context
            .lock()
            .as_ref()
            .map_or(0, |context| context.cache.len())
    }

    /// Captures the calling thread's stack, innermost frame first.
    ///
    /// Frames belonging to the capture machinery itself are left out.
    #[inline(never)]
    pub fn capture_current(&self) -> Result<Backtrace> {
        let leaf = Self::capture_current as *mut c_void;
        if !self.is_open() {
            return Err(Error::SessionClosed);
        }

        // The walk touches no session state.
        let ips = trace_current(leaf, self.max_depth);

        let mut guard = self.context.lock();
        let context = guard.as_mut().ok_or(Error::SessionClosed)?;
        let frames: FrameChain = ips
            .into_iter()
            .map(|ip| context.frame(ip, ip.saturating_sub(1), self.resolve_symbols))
            .collect();

        log::trace!("captured {} frames of the current thread", frames.len());
        Ok(frames.into())
    }

    /// Captures the saved stack of a suspended task, innermost frame first.
    ///
    /// The task must stay suspended for the duration of the call; the
    /// session does not lock it. An inconsistent saved stack is reported as
    /// [`Error::InconsistentStack`] and never yields a partial backtrace.
    pub fn capture_suspended<T: Task + ?Sized>(&self, task: &T) -> Result<Backtrace> {
        let mut guard = self.context.lock();
        let context = guard.as_mut().ok_or(Error::SessionClosed)?;

        let id = task.id();
        match task.status() {
            TaskStatus::Suspended => {}
            status => return Err(Error::TaskNotSuspended { task: id, status }),
        }
        let regs = task.saved_registers().ok_or(Error::StackUnavailable(id))?;

        let mut frames = FrameChain::new();
        let mut truncated = false;
        let walked = walk_task(task, regs, |ip| {
            if frames.len() >= self.max_depth {
                truncated = true;
                return false;
            }

            // Only the saved pc is exact; everything above it is a return
            // address.
            let lookup = if frames.is_empty() {
                ip
            } else {
                ip.saturating_sub(1)
            };
            frames.push(context.frame(ip, lookup, self.resolve_symbols));
            true
        });

        if let Err(fault) = walked {
            log::warn!("cannot walk stack of task {}: {}", id, fault);
            return Err(Error::InconsistentStack { task: id, fault });
        }
        if truncated {
            log::debug!(
                "stack of task {} truncated at {} frames",
                id,
                self.max_depth
            );
        }

        Ok(frames.into())
    }

    /// Releases the resolver and its caches. Closing the last open
    /// [`DebugInfoResolver`]-backed session also drops the process-wide
    /// debug-info cache. Closing a closed session is a no-op.
    pub fn close(&self) {
        match self.context.lock().take() {
            Some(context) => {
                log::info!(
                    "closing capture session ({} cached addresses, {} hits, {} misses)",
                    context.cache.len(),
                    context.cache.hits(),
                    context.cache.misses()
                );
            }
            None => log::debug!("capture session already closed"),
        }
    }
}
