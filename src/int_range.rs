use std::fmt;

use serde::{Deserialize, Serialize};

/// A simple type for integer ranges
///
/// All ranges follow the bed file range convention: 0-indexed, half-closed, [start,end)
///
/// This struct is used instead of the native rust Range type just to focus on the specific goals
/// of primarily genomic region intervals.
///
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
}

impl IntRange {
    pub fn from_pair(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn size(&self) -> i64 {
        self.end - self.start
    }

    /// Return true if the ranges intersect (adjacency does not count)
    ///
    pub fn intersect_range(&self, other: &IntRange) -> bool {
        other.end > self.start && other.start < self.end
    }

    /// Expand the range to cover `other`
    pub fn merge(&mut self, other: &IntRange) {
        if other.start < self.start {
            self.start = other.start;
        }
        if other.end > self.end {
            self.end = other.end;
        }
    }

    /// Return true if this range covers all of `other`
    pub fn is_superset_of(&self, other: &IntRange) -> bool {
        self.start <= other.start && self.end >= other.end
    }
}

impl fmt::Debug for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}-{})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_range() {
        let r1 = IntRange::from_pair(1, 4);
        let r2 = IntRange::from_pair(3, 8);
        let r3 = IntRange::from_pair(4, 9);

        assert!(r1.intersect_range(&r2));
        assert!(r2.intersect_range(&r1));

        // Adjacent ranges do not intersect
        assert!(!r1.intersect_range(&r3));
        assert!(!r3.intersect_range(&r1));
    }

    #[test]
    fn test_merge() {
        let mut r1 = IntRange::from_pair(10, 20);
        r1.merge(&IntRange::from_pair(15, 30));
        assert_eq!(r1, IntRange::from_pair(10, 30));

        r1.merge(&IntRange::from_pair(5, 12));
        assert_eq!(r1, IntRange::from_pair(5, 30));

        // A contained range changes nothing
        r1.merge(&IntRange::from_pair(6, 7));
        assert_eq!(r1, IntRange::from_pair(5, 30));
    }

    #[test]
    fn test_is_superset_of() {
        let r1 = IntRange::from_pair(10, 30);

        assert!(r1.is_superset_of(&IntRange::from_pair(10, 30)));
        assert!(r1.is_superset_of(&IntRange::from_pair(15, 25)));
        assert!(!r1.is_superset_of(&IntRange::from_pair(9, 30)));
        assert!(!r1.is_superset_of(&IntRange::from_pair(10, 31)));
    }
}
