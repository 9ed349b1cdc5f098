// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

use std::fmt::{Display, Error as FmtError, Formatter};
use std::io::Write;

use crate::chunk::{Chunks, FrameChain, FramesIter};
use crate::error::Result;
use crate::frames::Frame;

/// A captured call stack, innermost frame first.
///
/// A `Backtrace` owns every chunk of its frame chain and is immutable once
/// captured. Dropping it, or calling [`Backtrace::release`], frees the chain.
#[derive(Debug, Clone, Default)]
pub struct Backtrace {
    frames: FrameChain,
}

impl Backtrace {
    /// Total number of frames. Does not walk the chain.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> FramesIter<'_> {
        self.frames.iter()
    }

    pub fn chunks(&self) -> Chunks<'_> {
        self.frames.chunks()
    }

    /// Writes one line per frame, in capture order.
    ///
    /// Frames without a function name render as `??`; the source location is
    /// omitted when the file is unknown.
    pub fn print<W: Write>(&self, mut out: W) -> Result<()> {
        for (index, frame) in self.iter().enumerate() {
            writeln!(out, "{:>4}: {}", index, frame)?;
        }
        out.flush()?;

        Ok(())
    }

    /// Frees every chunk of the chain and returns the number of frames held.
    pub fn release(mut self) -> usize {
        let freed = self.frames.clear();
        log::trace!("released backtrace of {} frames", freed);
        freed
    }
}

impl From<FrameChain> for Backtrace {
    fn from(frames: FrameChain) -> Self {
        Self { frames }
    }
}

impl FromIterator<Frame> for Backtrace {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Backtrace {
    type Item = &'a Frame;
    type IntoIter = FramesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for Backtrace {
    fn fmt(&self, f: &mut Formatter) -> std::result::Result<(), FmtError> {
        for (index, frame) in self.iter().enumerate() {
            writeln!(f, "{:>4}: {}", index, frame)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(address: usize, name: &str) -> Frame {
        Frame {
            address,
            function: Some(name.into()),
            file: Some("rts/Task.rs".into()),
            line: Some(address as u32),
            column: Some(1),
        }
    }

    #[test]
    fn print_uses_placeholder_for_unresolved() {
        let bt: Backtrace = vec![named(1, "inner"), Frame::unresolved(2), named(3, "outer")]
            .into_iter()
            .collect();

        let mut out = Vec::new();
        bt.print(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "   0: 0x0000000000000001 inner (rts/Task.rs:1:1)");
        assert_eq!(lines[1], "   1: 0x0000000000000002 ??");
        assert_eq!(lines[2], "   2: 0x0000000000000003 outer (rts/Task.rs:3:1)");
        assert_eq!(out, bt.to_string());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn print_reports_io_errors() {
        let bt: Backtrace = vec![Frame::unresolved(1)].into_iter().collect();

        assert!(matches!(bt.print(BrokenPipe), Err(crate::Error::Io(_))));
    }

    #[test]
    fn print_empty() {
        let bt = Backtrace::default();
        let mut out = Vec::new();
        bt.print(&mut out).unwrap();

        assert!(out.is_empty());
        assert!(bt.is_empty());
    }

    #[test]
    fn release_returns_frame_count() {
        let bt: Backtrace = (0..1000).map(Frame::unresolved).collect();

        assert_eq!(bt.len(), 1000);
        assert_eq!(bt.chunks().count(), 4);
        assert_eq!(bt.release(), 1000);
    }

    #[test]
    fn text_outlives_backtrace() {
        let bt: Backtrace = vec![named(7, "kept")].into_iter().collect();
        let frame = bt.iter().next().cloned().unwrap();
        bt.release();

        assert_eq!(frame.function.as_deref(), Some("kept"));
    }
}
