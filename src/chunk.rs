// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

use smallvec::SmallVec;

use crate::frames::Frame;
use crate::CHUNK_CAPACITY;

/// A fixed-capacity block of frames.
///
/// Frames are stored inline and the chunk itself lives behind a `Box`, so a
/// growing [`FrameChain`] never moves frames that were already written.
#[derive(Debug, Clone)]
pub struct FrameChunk {
    frames: SmallVec<[Frame; CHUNK_CAPACITY]>,
}

impl FrameChunk {
    fn new() -> Self {
        FrameChunk {
            frames: SmallVec::new(),
        }
    }

    fn push(&mut self, frame: Frame) {
        debug_assert!(!self.is_full());
        self.frames.push(frame);
        debug_assert!(!self.frames.spilled());
    }

    /// Number of frames populated in this chunk.
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn capacity(&self) -> usize {
        CHUNK_CAPACITY
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= CHUNK_CAPACITY
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

/// Append-only chain of [`FrameChunk`]s.
///
/// Only the tail chunk may be partially filled. `len` always equals the sum of
/// `n_frames` over all chunks.
#[derive(Debug, Clone, Default)]
pub struct FrameChain {
    chunks: Vec<Box<FrameChunk>>,
    len: usize,
}

impl FrameChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame, linking a fresh chunk when the tail is full.
    pub fn push(&mut self, frame: Frame) {
        if self.chunks.last().map_or(true, |tail| tail.is_full()) {
            log::trace!("linking chunk #{} after {} frames", self.chunks.len(), self.len);
            self.chunks.push(Box::new(FrameChunk::new()));
        }

        if let Some(tail) = self.chunks.last_mut() {
            tail.push(frame);
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunks in link order. The last chunk yielded has no successor.
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            inner: self.chunks.iter(),
        }
    }

    /// Frames in capture order. Calling `iter` again restarts from the head.
    pub fn iter(&self) -> FramesIter<'_> {
        FramesIter {
            chunks: self.chunks.iter(),
            current: Default::default(),
            remaining: self.len,
        }
    }

    /// Drops every chunk and returns how many frames they held.
    pub(crate) fn clear(&mut self) -> usize {
        let freed = self.len;
        self.chunks = Vec::new();
        self.len = 0;
        freed
    }
}

impl Extend<Frame> for FrameChain {
    fn extend<I: IntoIterator<Item = Frame>>(&mut self, iter: I) {
        iter.into_iter().for_each(|frame| self.push(frame));
    }
}

impl FromIterator<Frame> for FrameChain {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        let mut chain = FrameChain::new();
        chain.extend(iter);
        chain
    }
}

impl<'a> IntoIterator for &'a FrameChain {
    type Item = &'a Frame;
    type IntoIter = FramesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Chunks<'a> {
    inner: std::slice::Iter<'a, Box<FrameChunk>>,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a FrameChunk;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|chunk| &**chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Chunks<'_> {}

pub struct FramesIter<'a> {
    chunks: std::slice::Iter<'a, Box<FrameChunk>>,
    current: std::slice::Iter<'a, Frame>,
    remaining: usize,
}

impl<'a> Iterator for FramesIter<'a> {
    type Item = &'a Frame;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(frame) = self.current.next() {
                self.remaining -= 1;
                return Some(frame);
            }

            let chunk = self.chunks.next()?;
            self.current = chunk.frames().iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for FramesIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(depth: usize) -> FrameChain {
        (0..depth).map(Frame::unresolved).collect()
    }

    #[test]
    fn depths_match_cached_len() {
        for depth in [0, 1, 255, 256, 257, 1000] {
            let chain = synthetic(depth);

            assert_eq!(chain.len(), depth);
            assert_eq!(chain.iter().count(), depth);
            assert_eq!(chain.chunks().map(|c| c.n_frames()).sum::<usize>(), depth);
            assert_eq!(chain.chunk_count(), depth.div_ceil(CHUNK_CAPACITY));
        }
    }

    #[test]
    fn one_full_chunk() {
        let chain = synthetic(256);
        let chunks: Vec<_> = chain.chunks().collect();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].n_frames(), 256);
        assert!(chunks[0].is_full());
    }

    #[test]
    fn overflow_links_second_chunk() {
        let chain = synthetic(257);
        let chunks: Vec<_> = chain.chunks().collect();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].n_frames(), 256);
        assert_eq!(chunks[1].n_frames(), 1);
        assert_eq!(chunks[1].frames()[0].address, 256);
    }

    #[test]
    fn empty_chain_owns_no_chunks() {
        let chain = FrameChain::new();

        assert!(chain.is_empty());
        assert_eq!(chain.chunk_count(), 0);
        assert!(chain.iter().next().is_none());
    }

    #[test]
    fn order_preserved_and_restartable() {
        let chain = synthetic(600);

        for _ in 0..2 {
            let addrs: Vec<usize> = chain.iter().map(|f| f.address).collect();
            assert_eq!(addrs, (0..600).collect::<Vec<_>>());
        }

        let mut iter = chain.iter();
        assert_eq!(iter.len(), 600);
        iter.nth(299);
        assert_eq!(iter.len(), 300);
    }

    #[test]
    fn clear_frees_everything() {
        let mut chain = synthetic(513);

        assert_eq!(chain.clear(), 513);
        assert_eq!(chain.chunk_count(), 0);
        assert!(chain.iter().next().is_none());
    }
}
