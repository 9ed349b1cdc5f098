// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

use libc::c_void;

/// How many frames are searched for the capture entry point before giving up
/// on trimming.
const LEAF_SEARCH_DEPTH: usize = 64;

/// Collects the return addresses of the calling thread, innermost first.
///
/// Frames up to and including the one whose enclosing function starts at
/// `leaf` are dropped. If `leaf` does not show up within the first
/// `LEAF_SEARCH_DEPTH` frames (it was inlined, or symbol addresses are not
/// available on this platform) nothing is dropped.
pub(crate) fn trace_current(leaf: *mut c_void, max_depth: usize) -> Vec<usize> {
    let mut ips = Vec::new();
    let mut past_leaf = false;

    backtrace::trace(|frame| {
        if !past_leaf {
            if frame.symbol_address() == leaf {
                ips.clear();
                past_leaf = true;
                return true;
            }
            if ips.len() >= LEAF_SEARCH_DEPTH {
                log::debug!("capture entry point not found, keeping all frames");
                past_leaf = true;
            }
        }

        ips.push(frame.ip() as usize);
        !past_leaf || ips.len() < max_depth
    });

    ips.truncate(max_depth);
    ips
}
