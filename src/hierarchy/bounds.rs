//! `[min, max]` bounds carried by every node of the hierarchy

use std::cmp::Ordering;

use crate::types::IndexValue;

#[derive(Debug, Clone)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: IndexValue> Bounds<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Smallest bounds covering both
    pub fn union(&self, other: &Bounds<T>) -> Bounds<T> {
        let min = if other.min.total_cmp(&self.min) == Ordering::Less {
            other.min.clone()
        } else {
            self.min.clone()
        };
        let max = if other.max.total_cmp(&self.max) == Ordering::Greater {
            other.max.clone()
        } else {
            self.max.clone()
        };
        Bounds { min, max }
    }

    /// Union over an iterator, `None` when empty
    pub fn union_all<'a>(mut iter: impl Iterator<Item = &'a Bounds<T>>) -> Option<Bounds<T>> {
        let first = iter.next()?.clone();
        Some(iter.fold(first, |acc, b| acc.union(b)))
    }

    /// Whether the interiors intersect. Bounds that only touch at an
    /// endpoint do not overlap.
    pub fn overlaps(&self, other: &Bounds<T>) -> bool {
        self.max.total_cmp(&other.min) == Ordering::Greater
            && other.max.total_cmp(&self.min) == Ordering::Greater
    }

    /// Length of the intersection, measured in value magnitudes
    pub fn overlap_amount(&self, other: &Bounds<T>) -> f64 {
        if !self.overlaps(other) {
            return 0.0;
        }
        let lo = self.min.magnitude().max(other.min.magnitude());
        let hi = self.max.magnitude().min(other.max.magnitude());
        (hi - lo).max(0.0)
    }

    /// Exact equality under the total order (NaN-safe)
    pub fn same_as(&self, other: &Bounds<T>) -> bool {
        self.min.total_cmp(&other.min) == Ordering::Equal
            && self.max.total_cmp(&other.max) == Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union() {
        let a = Bounds::new(3i32, 7);
        let b = Bounds::new(-1i32, 5);
        let u = a.union(&b);
        assert_eq!((u.min, u.max), (-1, 7));
        let all = Bounds::union_all([a, b, Bounds::new(0, 20)].iter()).unwrap();
        assert_eq!((all.min, all.max), (-1, 20));
    }

    #[test]
    fn test_touching_bounds_do_not_overlap() {
        let a = Bounds::new(1u8, 5);
        let b = Bounds::new(5u8, 9);
        assert!(!a.overlaps(&b));
        assert_eq!(a.overlap_amount(&b), 0.0);

        let c = Bounds::new(4u8, 6);
        assert!(a.overlaps(&c));
        assert_eq!(a.overlap_amount(&c), 1.0);
    }

    #[test]
    fn test_nan_bounds_compare_exactly() {
        let a = Bounds::new(f64::NAN, f64::NAN);
        assert!(a.same_as(&a.clone()));
    }
}
