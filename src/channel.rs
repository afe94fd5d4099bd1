//! Bounded blocking FIFO channel.
//!
//! A fixed-capacity ring buffer shared by any number of producer and consumer
//! threads. `enqueue` blocks while the ring is full, `dequeue` blocks while it
//! is empty. Emptiness is tracked by `size` alone, so any value of `T`
//! (including `None` when `T` is an `Option`) is a legitimate element.
//!
//! Locking is split so a producer and a consumer can make progress at the
//! same time:
//!
//! - `put_lock` / `take_lock` admit one producer / one consumer at a time and
//!   are held for the whole call, waits included.
//! - `not_full` / `not_empty` each pair a mutex with a condvar. Admission
//!   guarantees at most one waiter per condvar, so `notify_one` is enough.
//! - `ring` guards the slots and cursors, and is held only for the slot
//!   write or read plus the cursor and `size` update.

use super::errors::{PoolError, PoolResult};
use crossbeam::utils::CachePadded;
use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Condvar, Mutex, MutexGuard, PoisonError,
    },
};

pub struct BoundedChannel<T> {
    put_lock: CachePadded<Mutex<()>>,
    take_lock: CachePadded<Mutex<()>>,
    not_full: Signal,
    not_empty: Signal,
    ring: Mutex<Ring<T>>,
    // written only while `ring` is held; read lock-free by waiters
    size: CachePadded<AtomicUsize>,
    capacity: usize,
}

impl<T> BoundedChannel<T> {
    /// Creates an empty channel holding at most `capacity` elements.
    ///
    /// Fails with [`PoolError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> PoolResult<Self> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }

        Ok(Self {
            put_lock: CachePadded::new(Mutex::new(())),
            take_lock: CachePadded::new(Mutex::new(())),
            not_full: Signal::new(),
            not_empty: Signal::new(),
            ring: Mutex::new(Ring::new(capacity)),
            size: CachePadded::new(AtomicUsize::new(0)),
            capacity,
        })
    }

    /// Appends `item` at the tail, blocking while the channel is full.
    pub fn enqueue(&self, item: T) {
        let _admission = lock(&self.put_lock);

        self.not_full
            .wait_while(|| self.size.load(Ordering::Acquire) == self.capacity);

        {
            let mut ring = lock(&self.ring);
            ring.write(item);
            self.size.fetch_add(1, Ordering::Release);
        }

        self.not_empty.notify_one();
    }

    /// Removes and returns the element at the head, blocking while the
    /// channel is empty.
    pub fn dequeue(&self) -> T {
        let _admission = lock(&self.take_lock);

        self.not_empty
            .wait_while(|| self.size.load(Ordering::Acquire) == 0);

        let item = {
            let mut ring = lock(&self.ring);
            let item = ring.read();
            self.size.fetch_sub(1, Ordering::Release);
            item
        };

        self.not_full.notify_one();
        item
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of elements currently buffered. A snapshot; it may be stale by
    /// the time the caller looks at it.
    #[inline]
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }
}

impl<T> fmt::Debug for BoundedChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedChannel")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Mutex + condvar pair. The mutex guards nothing but the check-then-wait
/// step, which is what keeps a notify from slipping in between the two.
struct Signal {
    lock: Mutex<()>,
    cond: Condvar,
}

impl Signal {
    fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    // Spurious wakeups just re-run the check.
    fn wait_while(&self, mut blocked: impl FnMut() -> bool) {
        let mut guard = lock(&self.lock);
        while blocked() {
            guard = self
                .cond
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn notify_one(&self) {
        let _guard = lock(&self.lock);
        self.cond.notify_one();
    }
}

struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
        }
    }

    fn write(&mut self, item: T) {
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.slots.len();
    }

    fn read(&mut self) -> T {
        let item = match self.slots[self.head].take() {
            Some(item) => item,
            None => unreachable!("ring slot {} vacant while size > 0", self.head),
        };
        self.head = (self.head + 1) % self.slots.len();
        item
    }
}

// Every critical section leaves the guarded state consistent, so a poisoned
// lock is still safe to use.
#[inline]
fn lock<U>(mutex: &Mutex<U>) -> MutexGuard<'_, U> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
