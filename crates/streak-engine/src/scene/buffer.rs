/// Two slots holding this frame's and last frame's value.
///
/// Advancing flips which slot is "current" and overwrites the slot that held
/// the old previous value, so the old current becomes previous without a copy.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DoubleBuffered<T: Copy> {
    slots: [T; 2],
    current: usize,
}

impl<T: Copy> DoubleBuffered<T> {
    /// Both slots hold `value` (zero apparent motion).
    #[inline]
    pub const fn new(value: T) -> Self {
        Self { slots: [value, value], current: 0 }
    }

    #[inline]
    pub fn current(&self) -> T {
        self.slots[self.current]
    }

    #[inline]
    pub fn previous(&self) -> T {
        self.slots[self.current ^ 1]
    }

    /// Swaps roles and stores `next` as the new current value.
    #[inline]
    pub fn advance(&mut self, next: T) {
        self.current ^= 1;
        self.slots[self.current] = next;
    }

    /// Makes previous equal current without introducing a new value.
    #[inline]
    pub fn settle(&mut self) {
        self.slots[self.current ^ 1] = self.slots[self.current];
    }

    /// Overwrites both slots.
    #[inline]
    pub fn reset(&mut self, value: T) {
        self.slots = [value, value];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_current_into_previous() {
        let mut b = DoubleBuffered::new(1);
        b.advance(2);
        assert_eq!((b.previous(), b.current()), (1, 2));
        b.advance(3);
        assert_eq!((b.previous(), b.current()), (2, 3));
    }

    #[test]
    fn settle_is_stable_when_repeated() {
        let mut b = DoubleBuffered::new(1);
        b.advance(5);
        b.settle();
        assert_eq!((b.previous(), b.current()), (5, 5));
        b.settle();
        assert_eq!((b.previous(), b.current()), (5, 5));
    }
}
