use itertools::Itertools;
use std::fmt;

/// A lower or upper end of an interval: either infinite, or a finite value that is
/// included (`Closed`) or excluded (`Open`)
#[derive(Clone, Copy, PartialEq)]
pub enum Bound<T> {
    NINF, // Negative infinity
    Closed(T),
    Open(T),
    INF, // Positive infinity
}

use Bound::*;

impl<T: Copy> Bound<T> {
    fn finite(&self) -> Option<(T, bool)> {
        match *self {
            Closed(v) => Some((v, false)),
            Open(v) => Some((v, true)),
            _ => None,
        }
    }
}

impl<T: fmt::Display> fmt::Debug for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            INF => write!(f, "∞"),
            NINF => write!(f, "-∞"),
            Closed(v) | Open(v) => write!(f, "{}", v),
        }
    }
}

/// Abstract value that represents an interval between `low` and `high`.
/// An interval whose `low` lies above its `high` is `⊥`.
#[derive(Clone, Copy, PartialEq)]
pub struct Interval<T> {
    pub low: Bound<T>,
    pub high: Bound<T>,
}

impl<T: fmt::Display + Copy + PartialOrd> fmt::Debug for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "⊥");
        }
        let open = if matches!(self.low, Closed(_)) { "[" } else { "(" };
        let close = if matches!(self.high, Closed(_)) { "]" } else { ")" };
        write!(f, "{}{:?}, {:?}{}", open, self.low, self.high, close)
    }
}

impl<T: Copy + PartialOrd> Interval<T> {
    pub fn new(low: Bound<T>, high: Bound<T>) -> Self {
        Interval { low, high }
    }

    pub fn bottom() -> Self {
        Interval {
            low: INF,
            high: NINF,
        }
    }

    pub fn point(value: T) -> Self {
        Interval {
            low: Closed(value),
            high: Closed(value),
        }
    }

    pub fn is_bottom(&self) -> bool {
        match (self.low, self.high) {
            (INF, _) | (_, NINF) => true,
            (NINF, _) | (_, INF) => false,
            (Closed(l), Closed(h)) => l > h,
            (l, h) => match (l.finite(), h.finite()) {
                (Some((l, _)), Some((h, _))) => l >= h,
                _ => true,
            },
        }
    }

    pub fn contains(&self, value: T) -> bool {
        let above_low = match self.low {
            NINF => true,
            Closed(l) => value >= l,
            Open(l) => value > l,
            INF => false,
        };
        let below_high = match self.high {
            INF => true,
            Closed(h) => value <= h,
            Open(h) => value < h,
            NINF => false,
        };
        above_low && below_high
    }

    /// The tighter of two lower bounds
    fn max_low(a: Bound<T>, b: Bound<T>) -> Bound<T> {
        match (a, b) {
            (NINF, x) | (x, NINF) => x,
            (INF, _) | (_, INF) => INF,
            (x, y) => match (x.finite(), y.finite()) {
                (Some((vx, open_x)), Some((vy, _))) => {
                    if vx > vy || (vx == vy && open_x) {
                        x
                    } else {
                        y
                    }
                }
                _ => INF,
            },
        }
    }

    /// The tighter of two upper bounds
    fn min_high(a: Bound<T>, b: Bound<T>) -> Bound<T> {
        match (a, b) {
            (INF, x) | (x, INF) => x,
            (NINF, _) | (_, NINF) => NINF,
            (x, y) => match (x.finite(), y.finite()) {
                (Some((vx, open_x)), Some((vy, _))) => {
                    if vx < vy || (vx == vy && open_x) {
                        x
                    } else {
                        y
                    }
                }
                _ => NINF,
            },
        }
    }

    /// Intersection
    pub fn meet(&self, other: &Self) -> Self {
        Interval {
            low: Self::max_low(self.low, other.low),
            high: Self::min_high(self.high, other.high),
        }
    }
}

/// A finite union of intervals
#[derive(Clone, PartialEq)]
pub struct IntervalSet<T> {
    pub parts: Vec<Interval<T>>,
}

impl<T: fmt::Display + Copy + PartialOrd> fmt::Debug for IntervalSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            return write!(f, "⊥");
        }
        let parts = self.parts.iter().map(|i| format!("{:?}", i)).join(" ∪ ");
        write!(f, "{}", parts)
    }
}

impl<T: Copy + PartialOrd> IntervalSet<T> {
    pub fn new(parts: Vec<Interval<T>>) -> Self {
        let parts = parts.into_iter().filter(|i| !i.is_bottom()).collect();
        IntervalSet { parts }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(Interval::is_bottom)
    }

    pub fn contains(&self, value: T) -> bool {
        self.parts.iter().any(|i| i.contains(value))
    }

    pub fn meet(&self, other: &Self) -> Self {
        let mut parts = Vec::new();
        for a in &self.parts {
            for b in &other.parts {
                parts.push(a.meet(b));
            }
        }
        Self::new(parts)
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.meet(other).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bottom() {
        assert!(Interval::<i128>::bottom().is_bottom());
        assert!(!Interval::<i128>::new(NINF, INF).is_bottom());
        assert!(!Interval::point(3).is_bottom());
        assert!(Interval::new(Open(3.0), Closed(3.0)).is_bottom());
        assert!(Interval::new(Closed(4), Closed(3)).is_bottom());
    }

    #[test]
    fn test_meet() {
        let a = Interval::new(NINF, Open(5.0));
        let b = Interval::new(Closed(5.0), INF);
        assert!(a.meet(&b).is_bottom());
        let c = Interval::new(Closed(1), Closed(10));
        let d = Interval::new(Closed(5), INF);
        assert_eq!(c.meet(&d), Interval::new(Closed(5), Closed(10)));
    }

    #[test]
    fn test_set_disjoint() {
        // x != 1 against x == 1
        let ne = IntervalSet::new(vec![
            Interval::new(NINF, Closed(0)),
            Interval::new(Closed(2), INF),
        ]);
        let eq = IntervalSet::new(vec![Interval::point(1)]);
        assert!(ne.is_disjoint(&eq));
        assert!(ne.contains(7));
        assert!(!ne.contains(1));
        assert_eq!(format!("{:?}", ne), "(-∞, 0] ∪ [2, ∞)");
    }
}
