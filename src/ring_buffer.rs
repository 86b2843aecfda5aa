//! # Ring Buffer
//!
//! A fixed-capacity FIFO that overwrites its oldest entry when full. The
//! limiter uses one to keep a rolling log of recent admission decisions, but
//! the type is independent and usable on its own.
//!
//! ```text
//!     capacity 5, after pushing 3, 1, 234, 44, 9, 7:
//!
//!       slot:   0    1    2    3    4
//!             ┌────┬────┬────┬────┬────┐
//!             │ 7  │ 1  │234 │ 44 │ 9  │
//!             └────┴────┴────┴────┴────┘
//!               ▲    ▲
//!             newest oldest (head)       3 was overwritten by 7
//! ```
//!
//! Not synchronized: wrap it in a `Mutex` to share it.

use crate::leaky_bucket::{Error, Result};

/// Fixed-capacity circular buffer with overwrite-on-full semantics.
///
/// ```rust
/// use drip::{Error, RingBuffer};
///
/// let mut ring = RingBuffer::new(2)?;
/// ring.push("a");
/// ring.push("b");
/// assert_eq!(ring.push("c"), Some("a"));
///
/// assert_eq!(ring.pop()?, "b");
/// assert_eq!(ring.pop()?, "c");
/// assert!(matches!(ring.pop(), Err(Error::EmptyBuffer)));
/// # Ok::<(), drip::Error>(())
/// ```
#[derive(Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "ring buffer capacity must be greater than 0",
            ));
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ok(Self {
            slots,
            head: 0,
            len: 0,
        })
    }

    /// Maximum number of items.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of items currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when nothing has been pushed or everything was popped.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `true` when the next push will overwrite.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Appends `item`. When full, the oldest item is overwritten and returned.
    pub fn push(&mut self, item: T) -> Option<T> {
        let capacity = self.capacity();
        let tail = (self.head + self.len) % capacity;
        let evicted = self.slots[tail].replace(item);

        if self.len == capacity {
            // tail == head: we just overwrote the oldest slot
            self.head = (self.head + 1) % capacity;
        } else {
            self.len += 1;
        }
        evicted
    }

    /// Removes and returns the oldest item.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyBuffer`] when there is nothing to pop.
    pub fn pop(&mut self) -> Result<T> {
        if self.len == 0 {
            return Err(Error::EmptyBuffer);
        }
        let item = self.slots[self.head].take().ok_or(Error::EmptyBuffer)?;
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Ok(item)
    }

    /// The oldest item, without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.len == 0 {
            None
        } else {
            self.slots[self.head].as_ref()
        }
    }

    /// Drops every item. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % capacity].as_ref())
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copies the contents, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("items", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}
