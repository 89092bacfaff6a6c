//! Sample transport seams
//!
//! The modem never blocks on I/O itself: the decoder pulls one sample at a
//! time from a [`SampleSource`] and the encoder pushes one block per symbol
//! into a [`SampleSink`]. Waiting, timeouts and device handling belong to the
//! implementations.

use crate::error::{ModemError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait SampleSource {
    /// Next mono sample; `Err(SourceExhausted)` at end of stream
    fn next_sample(&mut self) -> Result<i16>;
}

pub trait SampleSink {
    /// Accept one symbol worth of PCM samples
    fn write_block(&mut self, block: &[i16]) -> Result<()>;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn next_sample(&mut self) -> Result<i16> {
        (**self).next_sample()
    }
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn write_block(&mut self, block: &[i16]) -> Result<()> {
        (**self).write_block(block)
    }
}

impl SampleSink for Vec<i16> {
    fn write_block(&mut self, block: &[i16]) -> Result<()> {
        self.extend_from_slice(block);
        Ok(())
    }
}

/// Reads samples from a borrowed buffer
pub struct SliceSource<'a> {
    samples: &'a [i16],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(samples: &'a [i16]) -> Self {
        Self { samples, pos: 0 }
    }

    /// Samples consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl SampleSource for SliceSource<'_> {
    fn next_sample(&mut self) -> Result<i16> {
        let s = *self
            .samples
            .get(self.pos)
            .ok_or(ModemError::SourceExhausted)?;
        self.pos += 1;
        Ok(s)
    }
}

/// Wraps any iterator of samples
pub struct IterSource<I> {
    iter: I,
}

impl<I: Iterator<Item = i16>> IterSource<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I: Iterator<Item = i16>> SampleSource for IterSource<I> {
    fn next_sample(&mut self) -> Result<i16> {
        self.iter.next().ok_or(ModemError::SourceExhausted)
    }
}

/// Shared flag that aborts a running encode or decode
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

pub struct CancellableSource<S> {
    inner: S,
    token: CancellationToken,
}

impl<S: SampleSource> CancellableSource<S> {
    pub fn new(inner: S, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: SampleSource> SampleSource for CancellableSource<S> {
    fn next_sample(&mut self) -> Result<i16> {
        if self.token.is_cancelled() {
            return Err(ModemError::Cancelled);
        }
        self.inner.next_sample()
    }
}

pub struct CancellableSink<S> {
    inner: S,
    token: CancellationToken,
}

impl<S: SampleSink> CancellableSink<S> {
    pub fn new(inner: S, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: SampleSink> SampleSink for CancellableSink<S> {
    fn write_block(&mut self, block: &[i16]) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(ModemError::Cancelled);
        }
        self.inner.write_block(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source() {
        let data = [1i16, -2, 3];
        let mut src = SliceSource::new(&data);
        assert_eq!(src.next_sample().unwrap(), 1);
        assert_eq!(src.next_sample().unwrap(), -2);
        assert_eq!(src.next_sample().unwrap(), 3);
        assert_eq!(src.position(), 3);
        assert!(matches!(src.next_sample(), Err(ModemError::SourceExhausted)));
    }

    #[test]
    fn test_iter_source() {
        let mut src = IterSource::new([5i16, 6].into_iter());
        assert_eq!(src.next_sample().unwrap(), 5);
        assert_eq!(src.next_sample().unwrap(), 6);
        assert!(src.next_sample().is_err());
    }

    #[test]
    fn test_cancellation() {
        let token = CancellationToken::new();
        let mut sink = CancellableSink::new(Vec::new(), token.clone());
        sink.write_block(&[1, 2]).unwrap();
        token.cancel();
        assert!(matches!(sink.write_block(&[3]), Err(ModemError::Cancelled)));
        assert_eq!(sink.into_inner(), vec![1, 2]);

        let data = [0i16; 4];
        let mut src = CancellableSource::new(SliceSource::new(&data), token);
        assert!(matches!(src.next_sample(), Err(ModemError::Cancelled)));
    }
}
