use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default queue depth in samples. At ~88.2k samples/s this is roughly 90 ms
/// of audio, enough to ride out a late host frame.
pub const DEFAULT_CAPACITY: usize = 8192;

/// Single-producer / single-consumer ring buffer of mono `f32` samples.
///
/// Intended for the emulator thread (producer) feeding an audio callback
/// thread (consumer) without locks. Capacity is rounded up to a power of two
/// so indices reduce with a mask; head and tail are free-running counters.
///
/// The queue is *lossy* when full: new pushes are dropped. Underrun is the
/// consumer's problem (it substitutes silence).
pub struct AudioProducer {
    inner: Arc<Inner>,
}

pub struct AudioConsumer {
    inner: Arc<Inner>,
}

struct Inner {
    buf: Box<[UnsafeCell<f32>]>,
    mask: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// Safe because:
// - Only the producer writes slots, at positions the consumer has released.
// - Only the consumer reads slots, at positions the producer has published.
// - All coordination happens through the head/tail atomics.
unsafe impl Sync for Inner {}
unsafe impl Send for Inner {}

impl Inner {
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    fn capacity(&self) -> usize {
        self.mask + 1
    }
}

pub fn audio_queue(capacity: usize) -> (AudioProducer, AudioConsumer) {
    let cap = capacity.next_power_of_two().max(2);
    let mut buf = Vec::with_capacity(cap);
    buf.resize_with(cap, || UnsafeCell::new(0.0));

    let inner = Arc::new(Inner {
        buf: buf.into_boxed_slice(),
        mask: cap - 1,
        head: AtomicUsize::new(0),
        tail: AtomicUsize::new(0),
    });

    (
        AudioProducer {
            inner: Arc::clone(&inner),
        },
        AudioConsumer { inner },
    )
}

impl AudioProducer {
    #[inline]
    pub fn push(&self, sample: f32) -> bool {
        let head = self.inner.head.load(Ordering::Relaxed);
        let tail = self.inner.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == self.inner.capacity() {
            // Full: drop newest.
            return false;
        }

        unsafe {
            *self.inner.buf[head & self.inner.mask].get() = sample;
        }
        self.inner.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl AudioConsumer {
    #[inline]
    pub fn pop(&self) -> Option<f32> {
        let tail = self.inner.tail.load(Ordering::Relaxed);
        let head = self.inner.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }

        let sample = unsafe { *self.inner.buf[tail & self.inner.mask].get() };
        self.inner.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(sample)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}
