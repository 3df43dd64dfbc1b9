// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! A generic set algebra over totally ordered value spaces.
//!
//! A [`ValueSet`] is a finite union of intervals, kept sorted, disjoint, and
//! non-adjacent. Everything a WHERE clause can say about a single column with
//! the supported operators (`=`, `<>`, `<`, `<=`, `>`, `>=`, `IN`, `NOT IN`)
//! is representable this way: equalities are degenerate intervals, `<>` is
//! the complement of one, and IN lists are unions of points.
//!
//! The algebra is deliberately oblivious to the element type. In particular
//! it never assumes a successor function, so an open interval like `(3, 4)`
//! over integers is kept as-is rather than recognized as empty; emptiness is
//! only detected structurally, which is all the containment checker needs.

use std::cmp::Ordering;
use std::ops::Bound;

use itertools::Itertools;

/// A contiguous run of values, with inclusive, exclusive, or unbounded endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRange<T> {
    low: Bound<T>,
    high: Bound<T>,
}

impl<T: Ord + Clone> ValueRange<T> {
    /// A range over the given endpoints. May be empty.
    pub fn new(low: Bound<T>, high: Bound<T>) -> Self {
        Self { low, high }
    }

    /// The degenerate range holding exactly `value`.
    pub fn point(value: T) -> Self {
        Self {
            low: Bound::Included(value.clone()),
            high: Bound::Included(value),
        }
    }

    /// Lower endpoint.
    pub fn low(&self) -> &Bound<T> {
        &self.low
    }

    /// Upper endpoint.
    pub fn high(&self) -> &Bound<T> {
        &self.high
    }

    /// Whether no value satisfies both endpoints.
    pub fn is_empty(&self) -> bool {
        match (&self.low, &self.high) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(low), Bound::Included(high)) => low > high,
            (Bound::Included(low), Bound::Excluded(high))
            | (Bound::Excluded(low), Bound::Included(high))
            | (Bound::Excluded(low), Bound::Excluded(high)) => low >= high,
        }
    }

    /// Whether `value` lies within this range.
    pub fn contains_value(&self, value: &T) -> bool {
        let above_low = match &self.low {
            Bound::Unbounded => true,
            Bound::Included(low) => value >= low,
            Bound::Excluded(low) => value > low,
        };
        let below_high = match &self.high {
            Bound::Unbounded => true,
            Bound::Included(high) => value <= high,
            Bound::Excluded(high) => value < high,
        };
        above_low && below_high
    }

    fn intersect(&self, other: &Self) -> Option<Self> {
        let low = match cmp_low(&self.low, &other.low) {
            Ordering::Less => other.low.clone(),
            _ => self.low.clone(),
        };
        let high = match cmp_high(&self.high, &other.high) {
            Ordering::Greater => other.high.clone(),
            _ => self.high.clone(),
        };
        let range = Self { low, high };
        (!range.is_empty()).then_some(range)
    }

    /// Whether `other` (whose low endpoint is not below ours) overlaps or is
    /// contiguous with this range, so that the union is a single range.
    fn merges_with(&self, other: &Self) -> bool {
        match (&self.high, &other.low) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
            (Bound::Included(high), Bound::Included(low))
            | (Bound::Included(high), Bound::Excluded(low))
            | (Bound::Excluded(high), Bound::Included(low)) => high >= low,
            // Both endpoints open at the same value leave a hole there.
            (Bound::Excluded(high), Bound::Excluded(low)) => high > low,
        }
    }
}

/// Order two lower endpoints: unbounded sorts first, and at the same value an
/// inclusive endpoint starts before an exclusive one.
fn cmp_low<T: Ord>(a: &Bound<T>, b: &Bound<T>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Less),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Greater),
    }
}

/// Order two upper endpoints: unbounded sorts last, and at the same value an
/// exclusive endpoint stops before an inclusive one.
fn cmp_high<T: Ord>(a: &Bound<T>, b: &Bound<T>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Greater),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Less),
    }
}

/// A finite union of value ranges, in normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSet<T> {
    ranges: Vec<ValueRange<T>>,
}

impl<T: Ord + Clone> ValueSet<T> {
    /// The empty set.
    pub fn none() -> Self {
        Self { ranges: vec![] }
    }

    /// The whole value space.
    pub fn all() -> Self {
        Self {
            ranges: vec![ValueRange::new(Bound::Unbounded, Bound::Unbounded)],
        }
    }

    /// The set holding exactly `value`.
    pub fn of_point(value: T) -> Self {
        Self {
            ranges: vec![ValueRange::point(value)],
        }
    }

    /// The union of the given points.
    pub fn of_points(values: impl IntoIterator<Item = T>) -> Self {
        Self::from_ranges(values.into_iter().map(ValueRange::point).collect_vec())
    }

    /// The set of values between the given endpoints.
    pub fn of_range(low: Bound<T>, high: Bound<T>) -> Self {
        Self::from_ranges(vec![ValueRange::new(low, high)])
    }

    /// Normalize an arbitrary collection of ranges: drop empty ranges, sort,
    /// and merge overlapping or contiguous neighbors.
    pub fn from_ranges(mut ranges: Vec<ValueRange<T>>) -> Self {
        ranges.retain(|range| !range.is_empty());
        ranges.sort_by(|a, b| cmp_low(&a.low, &b.low).then_with(|| cmp_high(&a.high, &b.high)));
        let mut merged: Vec<ValueRange<T>> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if last.merges_with(&range) => {
                    if cmp_high(&last.high, &range.high) == Ordering::Less {
                        last.high = range.high;
                    }
                }
                _ => merged.push(range),
            }
        }
        Self { ranges: merged }
    }

    /// The normalized ranges making up this set.
    pub fn ranges(&self) -> &[ValueRange<T>] {
        &self.ranges
    }

    /// Whether this set holds no values.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether this set holds every value of the space.
    pub fn is_all(&self) -> bool {
        matches!(
            self.ranges.as_slice(),
            [ValueRange {
                low: Bound::Unbounded,
                high: Bound::Unbounded,
            }]
        )
    }

    /// Whether `value` lies in this set.
    pub fn contains_value(&self, value: &T) -> bool {
        self.ranges.iter().any(|range| range.contains_value(value))
    }

    /// Values present in both sets.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut out = vec![];
        for a in &self.ranges {
            for b in &other.ranges {
                if let Some(common) = a.intersect(b) {
                    out.push(common);
                }
            }
        }
        Self::from_ranges(out)
    }

    /// Values present in either set.
    pub fn union(&self, other: &Self) -> Self {
        let mut ranges = self.ranges.clone();
        ranges.extend(other.ranges.iter().cloned());
        Self::from_ranges(ranges)
    }

    /// Values of the space not present in this set.
    pub fn complement(&self) -> Self {
        if self.ranges.is_empty() {
            return Self::all();
        }
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        let mut lower = Bound::Unbounded;
        let mut saturated = false;
        for range in &self.ranges {
            match &range.low {
                Bound::Unbounded => {}
                Bound::Included(value) => out.push(ValueRange::new(
                    lower,
                    Bound::Excluded(value.clone()),
                )),
                Bound::Excluded(value) => out.push(ValueRange::new(
                    lower,
                    Bound::Included(value.clone()),
                )),
            }
            match &range.high {
                Bound::Unbounded => {
                    saturated = true;
                    lower = Bound::Unbounded;
                    break;
                }
                Bound::Included(value) => lower = Bound::Excluded(value.clone()),
                Bound::Excluded(value) => lower = Bound::Included(value.clone()),
            }
        }
        if !saturated {
            out.push(ValueRange::new(lower, Bound::Unbounded));
        }
        Self::from_ranges(out)
    }

    /// Whether every value of `other` lies in this set.
    pub fn contains(&self, other: &Self) -> bool {
        other.intersect(&self.complement()).is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn above(value: i64) -> ValueSet<i64> {
        ValueSet::of_range(Bound::Excluded(value), Bound::Unbounded)
    }

    fn below(value: i64) -> ValueSet<i64> {
        ValueSet::of_range(Bound::Unbounded, Bound::Excluded(value))
    }

    #[test]
    fn test_empty_and_all() {
        assert!(ValueSet::<i64>::none().is_empty());
        assert!(ValueSet::<i64>::all().is_all());
        assert!(ValueSet::of_range(Bound::Included(5), Bound::Included(3)).is_empty());
        assert!(ValueSet::of_range(Bound::Included(3), Bound::Excluded(3)).is_empty());
        assert!(!ValueSet::of_point(3).is_empty());
    }

    #[test]
    fn test_intersect_disjoint_rays_is_empty() {
        // a < 5 AND a > 5
        assert!(below(5).intersect(&above(5)).is_empty());
        // a <= 5 AND a >= 5 pins the point
        let le = ValueSet::of_range(Bound::Unbounded, Bound::Included(5));
        let ge = ValueSet::of_range(Bound::Included(5), Bound::Unbounded);
        assert_eq!(le.intersect(&ge), ValueSet::of_point(5));
    }

    #[test]
    fn test_union_merges_contiguous_ranges() {
        // (-inf, 5] and (5, inf) cover everything
        let le = ValueSet::of_range(Bound::Unbounded, Bound::Included(5));
        assert!(le.union(&above(5)).is_all());
        // (-inf, 5) and (5, inf) leave a hole at 5
        let holed = below(5).union(&above(5));
        assert!(!holed.is_all());
        assert!(!holed.contains_value(&5));
        assert!(holed.contains_value(&4));
        assert!(holed.contains_value(&6));
        // overlapping ranges collapse
        let merged = ValueSet::of_range(Bound::Included(1), Bound::Included(5))
            .union(&ValueSet::of_range(Bound::Included(3), Bound::Included(9)));
        assert_eq!(
            merged,
            ValueSet::of_range(Bound::Included(1), Bound::Included(9))
        );
    }

    #[test]
    fn test_complement_round_trips() {
        let not_five = ValueSet::of_point(5).complement();
        assert!(!not_five.contains_value(&5));
        assert!(not_five.contains_value(&4));
        assert_eq!(not_five.complement(), ValueSet::of_point(5));
        assert_eq!(below(5).union(&above(5)), not_five);
        assert!(ValueSet::<i64>::all().complement().is_empty());
        assert!(ValueSet::<i64>::none().complement().is_all());
    }

    #[test]
    fn test_containment() {
        // a = 5 is inside a >= 5 but not inside a > 5
        let point = ValueSet::of_point(5);
        assert!(ValueSet::of_range(Bound::Included(5), Bound::Unbounded).contains(&point));
        assert!(!above(5).contains(&point));
        // IN (3, 5) is inside IN (3, 4, 5)
        assert!(ValueSet::of_points([3, 4, 5]).contains(&ValueSet::of_points([3, 5])));
        assert!(!ValueSet::of_points([3, 5]).contains(&ValueSet::of_points([3, 4])));
        // the empty set is inside everything
        assert!(point.contains(&ValueSet::none()));
        // everything is inside the full space
        assert!(ValueSet::all().contains(&not_in(&[5, 6])));
    }

    fn not_in(values: &[i64]) -> ValueSet<i64> {
        ValueSet::of_points(values.iter().copied()).complement()
    }

    #[test]
    fn test_string_sets_order_lexicographically() {
        let apples = ValueSet::of_point("apples".to_string());
        let above_banana = ValueSet::of_range(
            Bound::Excluded("banana".to_string()),
            Bound::Unbounded,
        );
        let not_banana = ValueSet::of_point("banana".to_string()).complement();
        assert!(not_banana.contains(&apples));
        assert!(not_banana.contains(&above_banana));
        assert!(!above_banana.contains(&apples));
    }
}
