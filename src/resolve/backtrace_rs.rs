// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use findshlibs::{Segment, SharedLibrary, TargetSharedLibrary};
use libc::c_void;

use super::{Resolve, Symbol};
use crate::{Error, Result};

impl Symbol for backtrace::Symbol {
    fn name(&self) -> Option<String> {
        self.name().map(|name| name.to_string())
    }

    fn addr(&self) -> Option<*mut c_void> {
        self.addr()
    }

    fn filename(&self) -> Option<PathBuf> {
        self.filename().map(|filename| filename.to_owned())
    }

    fn lineno(&self) -> Option<u32> {
        self.lineno()
    }

    fn colno(&self) -> Option<u32> {
        self.colno()
    }
}

/// A loaded object of the running process and its code segments.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub code: Vec<Range<usize>>,
}

impl Module {
    pub fn contains(&self, addr: usize) -> bool {
        self.code.iter().any(|range| range.contains(&addr))
    }
}

/// Number of live `DebugInfoResolver`s sharing the `backtrace` crate's
/// process-wide debug-info cache.
static OPEN_RESOLVERS: AtomicUsize = AtomicUsize::new(0);

/// Resolves addresses of the running process through the `backtrace` crate's
/// debug-info reader.
///
/// Addresses outside every loaded code segment (JIT code, garbage) are
/// reported as unresolved without touching the debug info.
///
/// Parsed debug sections live in a cache shared by the whole process. It is
/// dropped when the last resolver is dropped.
#[derive(Debug)]
pub struct DebugInfoResolver {
    modules: Vec<Module>,
}

impl DebugInfoResolver {
    pub fn new() -> Result<Self> {
        let modules = find_modules();
        if modules.is_empty() {
            return Err(Error::BackendUnavailable(
                "no loaded modules could be enumerated".to_owned(),
            ));
        }
        log::debug!("found {} loaded modules", modules.len());
        OPEN_RESOLVERS.fetch_add(1, Ordering::SeqCst);

        // Loads and parses the debug sections of this object up front, so the
        // first capture does not pay for it.
        backtrace::resolve(DebugInfoResolver::new as *mut c_void, |_| {});

        Ok(DebugInfoResolver { modules })
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module_of(&self, addr: usize) -> Option<&Module> {
        self.modules.iter().find(|module| module.contains(addr))
    }
}

impl Drop for DebugInfoResolver {
    fn drop(&mut self) {
        if OPEN_RESOLVERS.fetch_sub(1, Ordering::SeqCst) == 1 {
            log::debug!("last resolver dropped, clearing debug-info cache");
            backtrace::clear_symbol_cache();
        }
    }
}

impl Resolve for DebugInfoResolver {
    type S = backtrace::Symbol;

    fn resolve<F: FnMut(&Self::S)>(&mut self, addr: usize, cb: F) {
        if self.module_of(addr).is_none() {
            return;
        }
        // `backtrace::resolve` treats its argument as a return address and
        // looks up the byte before it.
        let Some(ret) = addr.checked_add(1) else {
            return;
        };
        backtrace::resolve(ret as *mut c_void, cb);
    }
}

fn find_modules() -> Vec<Module> {
    let mut modules = Vec::new();

    TargetSharedLibrary::each(|shlib| {
        let code: Vec<Range<usize>> = shlib
            .segments()
            .filter(|segment| segment.is_code())
            .map(|segment| {
                let start = segment.actual_virtual_memory_address(shlib).0;
                start..start + segment.len()
            })
            .collect();

        if !code.is_empty() {
            modules.push(Module {
                name: shlib.name().to_string_lossy().into_owned(),
                code,
            });
        }
    });

    modules
}
