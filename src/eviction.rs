//! Adaptive capacity bounds and tick-based staleness

use crate::Tick;

/// GC trigger window of a manager together with the hard floor/ceiling the
/// window adapts within.
///
/// # Examples
///
/// ```
/// use lru_objectpool::AdaptiveBounds;
///
/// let mut bounds = AdaptiveBounds::default();
/// bounds.set_item_max_bound(32);
/// bounds.set_item_adjust_min(8);
///
/// // Idle manager: repeated manual GC shrinks the window toward the floor
/// for _ in 0..64 {
///     bounds.adapt(0);
/// }
/// assert_eq!(bounds.item_max_bound(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveBounds {
    item_min_bound: usize,
    item_max_bound: usize,
    item_adjust_min: usize,
    item_adjust_max: usize,
}

impl Default for AdaptiveBounds {
    fn default() -> Self {
        Self {
            item_min_bound: 0,
            item_max_bound: 1024,
            item_adjust_min: 256,
            item_adjust_max: usize::MAX,
        }
    }
}

impl AdaptiveBounds {
    /// Objects kept back by a manual GC
    pub fn item_min_bound(&self) -> usize {
        self.item_min_bound
    }

    pub fn set_item_min_bound(&mut self, v: usize) {
        self.item_min_bound = v;
    }

    /// Pooled object count above which a push triggers eviction
    pub fn item_max_bound(&self) -> usize {
        self.item_max_bound
    }

    pub fn set_item_max_bound(&mut self, v: usize) {
        self.item_max_bound = v;
    }

    pub fn item_adjust_min(&self) -> usize {
        self.item_adjust_min
    }

    /// Set the floor. A floor at or above the ceiling lifts the ceiling to
    /// `floor + 1`.
    pub fn set_item_adjust_min(&mut self, v: usize) {
        self.item_adjust_min = v;
        if self.item_adjust_min >= self.item_adjust_max {
            self.item_adjust_max = self.item_adjust_min.saturating_add(1);
        }
    }

    pub fn item_adjust_max(&self) -> usize {
        self.item_adjust_max
    }

    /// Set the ceiling. A ceiling at or below the floor pulls the floor down
    /// to `ceiling - 1`.
    pub fn set_item_adjust_max(&mut self, v: usize) {
        self.item_adjust_max = v;
        if self.item_adjust_min >= self.item_adjust_max {
            self.item_adjust_min = self.item_adjust_max.saturating_sub(1);
        }
    }

    /// Move the window halfway toward `item_count`, then clamp it into the
    /// floor/ceiling. Returns the new `item_min_bound`, the number of
    /// objects a manual GC should keep.
    pub fn adapt(&mut self, item_count: usize) -> usize {
        self.item_min_bound = halfway(item_count, self.item_min_bound, 0);
        self.item_max_bound = halfway(item_count, self.item_max_bound, 1);

        let min_ceiling = self.item_adjust_max.saturating_sub(1);
        if self.item_min_bound > min_ceiling {
            self.item_min_bound = min_ceiling;
        }

        let above_min = self.item_min_bound.saturating_add(1);
        if self.item_max_bound < above_min {
            self.item_max_bound = above_min;
        }

        let above_floor = self.item_adjust_min.saturating_add(1);
        if self.item_max_bound < above_floor {
            self.item_max_bound = above_floor;
        }

        self.item_min_bound
    }

    /// Grow the max bound by one, never past the ceiling
    pub fn grow(&mut self) -> bool {
        if self.item_max_bound < self.item_adjust_max {
            self.item_max_bound += 1;
            true
        } else {
            false
        }
    }
}

/// `(a + b + bias) / 2` without overflow
fn halfway(a: usize, b: usize, bias: u128) -> usize {
    let sum = a as u128 + b as u128 + bias;
    // (MAX + MAX + 1) / 2 == MAX, so this never truncates
    (sum / 2) as usize
}

/// Logical staleness window measured in caller ticks
///
/// # Examples
///
/// ```
/// use lru_objectpool::StalenessWindow;
///
/// let window = StalenessWindow::new(60);
/// assert!(window.is_fresh(61, 1));
/// assert!(!window.is_fresh(62, 1));
///
/// // A zero timeout disables time based eviction
/// assert!(StalenessWindow::new(0).is_fresh(1_000_000, 1));
///
/// // A negative one makes every entry stale
/// assert!(!StalenessWindow::new(-5).is_fresh(1, 1));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StalenessWindow {
    timeout: Tick,
}

impl StalenessWindow {
    pub fn new(timeout: Tick) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Tick {
        self.timeout
    }

    pub fn is_enabled(&self) -> bool {
        self.timeout != 0
    }

    /// Whether an entry pushed at `pushed_at` is still fresh at `now`.
    /// A negative timeout leaves no entry fresh.
    pub fn is_fresh(&self, now: Tick, pushed_at: Tick) -> bool {
        if !self.is_enabled() {
            return true;
        }
        match u64::try_from(self.timeout) {
            Ok(timeout) => now.abs_diff(pushed_at) <= timeout,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let bounds = AdaptiveBounds::default();
        assert_eq!(bounds.item_min_bound(), 0);
        assert_eq!(bounds.item_max_bound(), 1024);
        assert_eq!(bounds.item_adjust_min(), 256);
        assert_eq!(bounds.item_adjust_max(), usize::MAX);
    }

    #[test]
    fn test_adjust_setters_keep_window_open() {
        let mut bounds = AdaptiveBounds::default();
        bounds.set_item_adjust_max(100);
        bounds.set_item_adjust_min(100);
        assert_eq!(bounds.item_adjust_min(), 100);
        assert_eq!(bounds.item_adjust_max(), 101);

        bounds.set_item_adjust_max(50);
        assert_eq!(bounds.item_adjust_min(), 49);
        assert_eq!(bounds.item_adjust_max(), 50);

        bounds.set_item_adjust_min(usize::MAX);
        assert_eq!(bounds.item_adjust_max(), usize::MAX);
    }

    #[test]
    fn test_adapt_formula() {
        let mut bounds = AdaptiveBounds::default();
        // min = (2 + 0) / 2, max = (2 + 1024 + 1) / 2
        assert_eq!(bounds.adapt(2), 1);
        assert_eq!(bounds.item_min_bound(), 1);
        assert_eq!(bounds.item_max_bound(), 513);
    }

    #[test]
    fn test_adapt_clamps_to_floor_and_ceiling() {
        let mut bounds = AdaptiveBounds::default();
        bounds.set_item_adjust_min(4);
        bounds.set_item_adjust_max(10);

        bounds.adapt(1000);
        assert_eq!(bounds.item_min_bound(), 9);
        assert!(bounds.item_max_bound() > bounds.item_min_bound());

        for _ in 0..64 {
            bounds.adapt(0);
        }
        assert_eq!(bounds.item_min_bound(), 0);
        assert_eq!(bounds.item_max_bound(), 5);
    }

    #[test]
    fn test_adapt_does_not_overflow() {
        let mut bounds = AdaptiveBounds::default();
        bounds.set_item_max_bound(usize::MAX);
        bounds.adapt(usize::MAX);
        assert_eq!(bounds.item_max_bound(), usize::MAX);
        assert_eq!(bounds.item_min_bound(), usize::MAX / 2);
    }

    #[test]
    fn test_grow_stops_at_ceiling() {
        let mut bounds = AdaptiveBounds::default();
        bounds.set_item_max_bound(63);
        bounds.set_item_adjust_max(64);
        assert!(bounds.grow());
        assert!(!bounds.grow());
        assert_eq!(bounds.item_max_bound(), 64);
    }

    #[test]
    fn test_staleness_window() {
        let window = StalenessWindow::new(60);
        assert!(window.is_fresh(1, 1));
        assert!(window.is_fresh(61, 1));
        assert!(!window.is_fresh(62, 1));
        // Absolute difference, a clock going backwards is also stale
        assert!(!window.is_fresh(1, 62));
        assert!(StalenessWindow::default().is_fresh(Tick::MAX, Tick::MIN));
    }

    #[test]
    fn test_negative_timeout_is_always_stale() {
        let window = StalenessWindow::new(-5);
        assert!(window.is_enabled());
        assert!(!window.is_fresh(1, 1));
        assert!(!window.is_fresh(103, 100));
    }
}
