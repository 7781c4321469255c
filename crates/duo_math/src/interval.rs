/// Closed parametric range `[min, max]`.
///
/// Used for ray query bounds and for the per-axis extents of an [`Aabb`](crate::Aabb).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns the size of the interval (max - min).
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    /// True if x lies in [min, max].
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// True if the interval contains no values.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Same lower bound, new upper bound.
    pub fn with_max(&self, max: f32) -> Interval {
        Interval::new(self.min, max)
    }

    /// Expands the interval by delta/2 on each side.
    pub fn expand(&self, delta: f32) -> Interval {
        let padding = delta / 2.0;
        Interval::new(self.min - padding, self.max + padding)
    }

    /// Smallest interval containing both `a` and `b`.
    pub fn surrounding(a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.min.min(b.min), a.max.max(b.max))
    }

    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    pub const UNIVERSE: Interval = Interval {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let bounds = Interval::new(0.25, 1.0);

        assert!(bounds.contains(0.25));
        assert!(bounds.contains(1.0));
        assert!(!bounds.contains(0.2499));
        assert!(!bounds.contains(1.0001));
    }

    #[test]
    fn test_with_max_shrinks_search() {
        let bounds = Interval::new(0.1, 100.0).with_max(3.0);
        assert_eq!(bounds, Interval::new(0.1, 3.0));
        assert!(!bounds.contains(3.5));
    }

    #[test]
    fn test_empty_and_universe() {
        assert!(Interval::EMPTY.is_empty());
        assert!(!Interval::EMPTY.contains(0.0));
        assert!(!Interval::UNIVERSE.is_empty());
        assert!(Interval::UNIVERSE.contains(-1e30));
    }

    #[test]
    fn test_surrounding_with_empty_is_identity() {
        let a = Interval::new(-2.0, 5.0);
        assert_eq!(Interval::surrounding(&Interval::EMPTY, &a), a);
    }

    #[test]
    fn test_expand_pads_both_sides() {
        let padded = Interval::new(1.0, 1.0).expand(0.5);
        assert_eq!(padded.min, 0.75);
        assert_eq!(padded.max, 1.25);
    }
}
