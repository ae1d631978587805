/// Growable free-list of recycled values.
///
/// `acquire` hands back a previously released value when one is available and
/// only falls back to `make` when the list is empty. `release` takes ownership,
/// so a released value can no longer be reached by its previous holder.
#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<T>,
    allocated: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            allocated: 0,
        }
    }

    pub fn acquire(&mut self, make: impl FnOnce() -> T) -> T {
        match self.free.pop() {
            Some(value) => value,
            None => {
                self.allocated += 1;
                make()
            }
        }
    }

    pub fn release(&mut self, value: T) {
        self.free.push(value);
    }

    /// Number of values waiting to be reused.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of values ever created through this pool.
    pub fn allocated(&self) -> usize {
        self.allocated
    }
}
