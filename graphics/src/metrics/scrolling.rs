//! Fixed-capacity circular history.

/// Default number of samples kept per series.
pub const DEFAULT_HISTORY_CAPACITY: usize = 2000;

/// A circular buffer keeping the most recent `capacity` samples.
///
/// ```
/// use stratus_graphics::metrics::ScrollingBuffer;
///
/// let mut buffer = ScrollingBuffer::new(2);
/// buffer.push(1.0);
/// buffer.push(2.0);
/// buffer.push(3.0);
/// assert_eq!(buffer.iter().copied().collect::<Vec<f32>>(), vec![2.0, 3.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    offset: usize,
}

impl<T> Default for ScrollingBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl<T> ScrollingBuffer<T> {
    /// Create an empty buffer. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            offset: 0,
        }
    }

    /// Maximum number of samples kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples currently kept.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing was pushed since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a sample, overwriting the oldest one when full.
    pub fn push(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
        } else {
            self.data[self.offset] = value;
        }
        self.offset = (self.offset + 1) % self.capacity;
    }

    fn current_index(&self) -> Option<usize> {
        if self.data.is_empty() {
            None
        } else {
            Some((self.offset + self.capacity - 1) % self.capacity)
        }
    }

    /// The most recent sample.
    pub fn current(&self) -> Option<&T> {
        self.current_index().map(|index| &self.data[index])
    }

    /// The most recent sample, mutably.
    pub fn current_mut(&mut self) -> Option<&mut T> {
        self.current_index().map(move |index| &mut self.data[index])
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let split = if self.data.len() < self.capacity { 0 } else { self.offset };
        self.data[split..].iter().chain(self.data[..split].iter())
    }

    /// Drop every sample.
    pub fn clear(&mut self) {
        self.data.clear();
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_current() {
        let mut buffer = ScrollingBuffer::new(3);
        assert_eq!(buffer.current(), None);
        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.current(), Some(&2));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_wraparound_order() {
        let mut buffer = ScrollingBuffer::new(3);
        for value in 1..=5 {
            buffer.push(value);
        }
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(buffer.current(), Some(&5));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_current_mut_accumulates() {
        let mut buffer = ScrollingBuffer::new(4);
        buffer.push(0.0f32);
        if let Some(current) = buffer.current_mut() {
            *current += 1.5;
        }
        assert_eq!(buffer.current(), Some(&1.5));
    }

    #[test]
    fn test_clear() {
        let mut buffer: ScrollingBuffer<u32> = ScrollingBuffer::default();
        assert_eq!(buffer.capacity(), DEFAULT_HISTORY_CAPACITY);
        buffer.push(7);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.current(), None);
    }
}
