use std::cmp::Ordering;

use crate::GsError;

/// Floating point type used throughout gridscope.
pub type Real = f64;

/// Bit-exact key for an axis coordinate.
///
/// The measurement engine replays identical machine representations for
/// repeated set-points, so axis deduplication compares raw bits rather than
/// applying a tolerance. Ordering follows `f64::total_cmp`, which agrees with
/// numeric order for the finite coordinates we keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoordKey(u64);

impl CoordKey {
    pub fn new(v: Real) -> Self {
        Self(v.to_bits())
    }

    pub fn value(self) -> Real {
        Real::from_bits(self.0)
    }
}

impl Ord for CoordKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value().total_cmp(&other.value())
    }
}

impl PartialOrd for CoordKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Index of the coordinate in a sorted slice closest to `target`.
/// Ties break toward the lower index. `None` on an empty slice.
pub fn nearest_index(coords: &[Real], target: Real) -> Option<usize> {
    if coords.is_empty() {
        return None;
    }
    let hi = coords.partition_point(|c| *c < target);
    if hi == 0 {
        return Some(0);
    }
    if hi == coords.len() {
        return Some(coords.len() - 1);
    }
    let lo = hi - 1;
    if (target - coords[lo]).abs() <= (coords[hi] - target).abs() {
        Some(lo)
    } else {
        Some(hi)
    }
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, GsError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(GsError::NonFinite { what, value: v })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn coord_key_orders_numerically() {
        let mut keys = vec![
            CoordKey::new(3.0),
            CoordKey::new(-1.5),
            CoordKey::new(0.0),
            CoordKey::new(2.25),
        ];
        keys.sort();
        let values: Vec<f64> = keys.iter().map(|k| k.value()).collect();
        assert_eq!(values, vec![-1.5, 0.0, 2.25, 3.0]);
    }

    #[test]
    fn coord_key_is_bit_exact() {
        assert_eq!(CoordKey::new(0.1), CoordKey::new(0.1));
        assert_ne!(CoordKey::new(0.1), CoordKey::new(0.1 + f64::EPSILON));
    }

    #[test]
    fn nearest_index_exact_hit() {
        let coords = [0.0, 1.0, 2.0];
        assert_eq!(nearest_index(&coords, 1.0), Some(1));
    }

    #[test]
    fn nearest_index_tie_prefers_lower() {
        let coords = [0.0, 1.0];
        assert_eq!(nearest_index(&coords, 0.5), Some(0));
    }

    #[test]
    fn nearest_index_clamps_to_ends() {
        let coords = [0.0, 1.0, 2.0];
        assert_eq!(nearest_index(&coords, -10.0), Some(0));
        assert_eq!(nearest_index(&coords, 10.0), Some(2));
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    proptest! {
        #[test]
        fn nearest_index_is_actually_nearest(
            mut coords in proptest::collection::vec(-1e6f64..1e6, 1..32),
            target in -1e6f64..1e6,
        ) {
            coords.sort_by(f64::total_cmp);
            coords.dedup();
            let idx = nearest_index(&coords, target).unwrap();
            let best = (target - coords[idx]).abs();
            for c in &coords {
                prop_assert!(best <= (target - c).abs());
            }
        }
    }
}
