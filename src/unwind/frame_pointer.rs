// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

use std::mem::size_of;

use super::StackFault;
use crate::task::{SavedRegisters, Task};

const WORD: usize = size_of::<usize>();

/// Walks the frame-pointer chain of a suspended task.
///
/// The saved `pc` is reported first. Each record at `fp` is laid out as
/// `[saved fp, return address]`; a saved fp of zero marks the outermost
/// record. `cb` returns `false` to stop early.
pub(crate) fn walk_task<T, F>(task: &T, regs: SavedRegisters, mut cb: F) -> Result<(), StackFault>
where
    T: Task + ?Sized,
    F: FnMut(usize) -> bool,
{
    if !cb(regs.pc) {
        return Ok(());
    }

    let mut frame_pointer = regs.fp;
    // The stack grows from high address to low address, so every record must
    // sit above the previous one.
    let mut floor = regs.sp;
    while frame_pointer != 0 {
        if frame_pointer % WORD != 0 {
            return Err(StackFault::Misaligned(frame_pointer));
        }
        if frame_pointer < floor {
            return Err(StackFault::NotMonotonic {
                fp: frame_pointer,
                floor,
            });
        }

        let ret_slot = frame_pointer
            .checked_add(WORD)
            .ok_or(StackFault::Unreadable(frame_pointer))?;
        let next = task
            .read_word(frame_pointer)
            .ok_or(StackFault::Unreadable(frame_pointer))?;
        let ret = task
            .read_word(ret_slot)
            .ok_or(StackFault::Unreadable(ret_slot))?;

        if !cb(ret) {
            return Ok(());
        }

        floor = ret_slot
            .checked_add(WORD)
            .ok_or(StackFault::Unreadable(ret_slot))?;
        frame_pointer = next;
    }

    Ok(())
}
