// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use libc::c_void;

use crate::frames::Frame;

mod backtrace_rs;

pub use backtrace_rs::{DebugInfoResolver, Module};

pub trait Symbol: Sized {
    fn name(&self) -> Option<String>;
    fn addr(&self) -> Option<*mut c_void>;
    fn filename(&self) -> Option<PathBuf>;
    fn lineno(&self) -> Option<u32>;
    fn colno(&self) -> Option<u32>;
}

/// Address to source location resolution, backed by an external debug-info
/// library.
///
/// `resolve` reports every symbol covering the instruction at exactly `addr`
/// through `cb`, innermost inlined symbol first. Callers adjust return
/// addresses themselves. Reporting nothing means the address is unresolved.
pub trait Resolve: Send {
    type S: Symbol;

    fn resolve<F: FnMut(&Self::S)>(&mut self, addr: usize, cb: F);
}

#[derive(Debug, Clone, Default)]
struct Location {
    function: Option<Arc<str>>,
    file: Option<Arc<str>>,
    line: Option<u32>,
    column: Option<u32>,
}

/// Memoized resolutions and interned symbol text of one session.
#[derive(Debug, Default)]
pub struct SymbolCache {
    locations: HashMap<usize, Location>,
    strings: HashSet<Arc<str>>,
    hits: u64,
    misses: u64,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct lookup addresses resolved so far.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Forgets every resolution. Frames already handed out keep their text.
    pub fn clear(&mut self) {
        self.locations.clear();
        self.strings.clear();
    }

    /// Builds the frame for `address`, resolving `lookup` through `resolver`
    /// unless it was seen before. When several symbols cover `lookup` the
    /// first one reported wins.
    pub fn frame<R: Resolve>(&mut self, resolver: &mut R, address: usize, lookup: usize) -> Frame {
        if let Some(location) = self.locations.get(&lookup) {
            self.hits += 1;
            return location.to_frame(address);
        }
        self.misses += 1;

        let mut first = None;
        resolver.resolve(lookup, |symbol| {
            if first.is_none() {
                first = Some((
                    symbol.name(),
                    symbol.filename(),
                    symbol.lineno(),
                    symbol.colno(),
                ));
            }
        });

        let location = match first {
            Some((name, filename, line, column)) => Location {
                function: name.map(|name| self.intern(&name)),
                file: filename.map(|filename| self.intern(&filename.to_string_lossy())),
                line,
                column,
            },
            None => {
                log::trace!("no symbol for {:#x}", lookup);
                Location::default()
            }
        };

        let frame = location.to_frame(address);
        self.locations.insert(lookup, location);
        frame
    }

    fn intern(&mut self, text: &str) -> Arc<str> {
        if let Some(interned) = self.strings.get(text) {
            return interned.clone();
        }

        let interned: Arc<str> = Arc::from(text);
        self.strings.insert(interned.clone());
        interned
    }
}

impl Location {
    fn to_frame(&self, address: usize) -> Frame {
        Frame {
            address,
            function: self.function.clone(),
            file: self.file.clone(),
            line: self.line,
            column: self.column,
        }
    }
}
