use std::sync::{Mutex, PoisonError};

/// Free-list of intermediate tile buffers for one channel flavor.
///
/// A checked-out buffer is exclusively owned by one worker for the duration
/// of a tile batch. Buffers are handed back with [`restore`]; anything that
/// is no longer the pool's default size is dropped instead, which bounds
/// steady-state memory when a call had to grow its scratch space.
///
/// [`restore`]: BufferPool::restore
pub(crate) struct BufferPool<T> {
    default_len: usize,
    slots: Mutex<Vec<Vec<T>>>,
}

impl<T: Copy + Default> BufferPool<T> {
    pub const fn new(default_len: usize) -> Self {
        Self {
            default_len,
            slots: Mutex::new(Vec::new()),
        }
    }

    pub fn checkout(&self) -> Vec<T> {
        let reused = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        reused.unwrap_or_else(|| vec![T::default(); self.default_len])
    }

    pub fn restore(&self, buf: Vec<T>) {
        if buf.len() == self.default_len {
            self.slots
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(buf);
        }
    }
}
