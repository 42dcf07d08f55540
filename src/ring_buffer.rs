//! Fixed-capacity byte queue shared between a UART receive interrupt and the poll loop.
//!
//! Exactly one producer may call [`RingBuffer::push`] and exactly one consumer may call
//! [`RingBuffer::pop`]. Under that discipline the queue is lock-free: the producer owns
//! `head`, the consumer owns `tail`, and each side publishes its index with `Release`
//! after touching the slot.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

pub struct RingBuffer<const N: usize> {
    slots: UnsafeCell<[u8; N]>,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// SAFETY: a slot is only written by the producer while it lies outside `tail..head`, and only
// read by the consumer while it lies inside. The index stores publish those transitions.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        const { assert!(N.is_power_of_two() && N >= 2) };
        Self {
            slots: UnsafeCell::new([0; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Number of bytes the queue can hold at once.
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Producer side. Returns `false` and drops the byte when the queue is full.
    pub fn push(&self, byte: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) & (N - 1);
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: `head` is outside the readable region, only the producer writes it.
        unsafe { (*self.slots.get())[head] = byte };
        self.head.store(next, Ordering::Release);
        true
    }

    /// Consumer side. Returns the oldest unread byte.
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: `tail` is inside the readable region, the producer will not touch it
        // until the store below hands it back.
        let byte = unsafe { (*self.slots.get())[tail] };
        self.tail.store((tail + 1) & (N - 1), Ordering::Release);
        Some(byte)
    }

    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & (N - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Consumer side. Pops every byte currently queued into `sink`.
    pub fn drain(&self, mut sink: impl FnMut(u8)) {
        while let Some(byte) = self.pop() {
            sink(byte);
        }
    }
}
