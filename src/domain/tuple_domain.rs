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

//! Typed per-column domains and their conjunctive combination.
//!
//! A [`Domain`] describes the admissible values of one column: a [`ValueSet`]
//! over the column's value space plus a bit recording whether NULL is
//! admitted. A [`TupleDomain`] maps column names to domains, with the
//! semantics that a row is admitted iff every column's value lies in its
//! mapped domain; columns absent from the map are unconstrained.
//!
//! Value spaces are typed. Strings carry their declared length as part of the
//! type: `'apples'` and `'banana'` live in the same six-character space, while
//! `'apple'` does not, and combining domains across such spaces is a
//! [`DomainError`] the caller must surface as "cannot decide".

use std::collections::BTreeMap;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use thiserror::Error;

use super::value_set::ValueSet;

/// The value space a domain ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// 64-bit signed integers.
    BigInt,
    /// Doubles. Decimal literals are approximated by this space.
    Double,
    /// Strings of a fixed declared length, ordered lexicographically.
    Varchar {
        /// Declared length in characters.
        length: usize,
    },
}

/// A single typed value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScalarValue {
    /// A 64-bit integer.
    BigInt(i64),
    /// A double, wrapped for total ordering.
    Double(OrderedFloat<f64>),
    /// A string.
    Varchar(String),
}

impl ScalarValue {
    /// The value space this value belongs to.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarValue::BigInt(_) => ScalarType::BigInt,
            ScalarValue::Double(_) => ScalarType::Double,
            ScalarValue::Varchar(s) => ScalarType::Varchar {
                length: s.chars().count(),
            },
        }
    }
}

/// Error from combining domains over different value spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("mismatched value spaces: {0:?} vs {1:?}")]
pub struct DomainError(
    /// Left-hand value space.
    pub ScalarType,
    /// Right-hand value space.
    pub ScalarType,
);

/// The typed value-set payload of a [`Domain`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum TypedValues {
    BigInt(ValueSet<i64>),
    Double(ValueSet<OrderedFloat<f64>>),
    Varchar {
        length: usize,
        values: ValueSet<String>,
    },
}

impl TypedValues {
    fn scalar_type(&self) -> ScalarType {
        match self {
            TypedValues::BigInt(_) => ScalarType::BigInt,
            TypedValues::Double(_) => ScalarType::Double,
            TypedValues::Varchar { length, .. } => ScalarType::Varchar { length: *length },
        }
    }
}

/// Build a [`TypedValues`] from a [`ScalarValue`], applying `$build` to the
/// unwrapped value in whichever space it lives in.
macro_rules! typed_values {
    ($value:expr, $build:expr) => {
        match $value {
            ScalarValue::BigInt(v) => TypedValues::BigInt($build(v)),
            ScalarValue::Double(v) => TypedValues::Double($build(v)),
            ScalarValue::Varchar(s) => {
                let length = s.chars().count();
                TypedValues::Varchar {
                    length,
                    values: $build(s),
                }
            }
        }
    };
}

/// Combine two [`TypedValues`] of the same space with `$combine`, or fail
/// with a [`DomainError`].
macro_rules! zip_values {
    ($a:expr, $b:expr, $combine:expr) => {
        match ($a, $b) {
            (TypedValues::BigInt(x), TypedValues::BigInt(y)) => {
                Ok(TypedValues::BigInt($combine(x, y)))
            }
            (TypedValues::Double(x), TypedValues::Double(y)) => {
                Ok(TypedValues::Double($combine(x, y)))
            }
            (
                TypedValues::Varchar {
                    length: la,
                    values: x,
                },
                TypedValues::Varchar {
                    length: lb,
                    values: y,
                },
            ) if la == lb => Ok(TypedValues::Varchar {
                length: *la,
                values: $combine(x, y),
            }),
            (a, b) => Err(DomainError(a.scalar_type(), b.scalar_type())),
        }
    };
}

/// The admissible values of a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    values: TypedValues,
    null_allowed: bool,
}

impl Domain {
    fn empty_set(scalar_type: ScalarType) -> TypedValues {
        match scalar_type {
            ScalarType::BigInt => TypedValues::BigInt(ValueSet::none()),
            ScalarType::Double => TypedValues::Double(ValueSet::none()),
            ScalarType::Varchar { length } => TypedValues::Varchar {
                length,
                values: ValueSet::none(),
            },
        }
    }

    /// The unconstrained domain: every value of the space, NULL included.
    pub fn all(scalar_type: ScalarType) -> Self {
        let values = match scalar_type {
            ScalarType::BigInt => TypedValues::BigInt(ValueSet::all()),
            ScalarType::Double => TypedValues::Double(ValueSet::all()),
            ScalarType::Varchar { length } => TypedValues::Varchar {
                length,
                values: ValueSet::all(),
            },
        };
        Self {
            values,
            null_allowed: true,
        }
    }

    /// The unsatisfiable domain.
    pub fn none(scalar_type: ScalarType) -> Self {
        Self {
            values: Self::empty_set(scalar_type),
            null_allowed: false,
        }
    }

    /// The domain admitting exactly `value`. NULL is excluded, as in SQL
    /// comparison semantics.
    pub fn point(value: ScalarValue) -> Self {
        Self {
            values: typed_values!(value, ValueSet::of_point),
            null_allowed: false,
        }
    }

    /// The domain admitting exactly the given values. Fails when the values
    /// span different spaces (including strings of different lengths).
    pub fn points(
        values: impl IntoIterator<Item = ScalarValue>,
    ) -> Result<Self, DomainError> {
        let mut out: Option<Self> = None;
        for value in values {
            let next = Self::point(value);
            out = Some(match out {
                None => next,
                Some(acc) => acc.union(&next)?,
            });
        }
        // An empty IN list admits nothing; type it as an empty integer space.
        Ok(out.unwrap_or_else(|| Self::none(ScalarType::BigInt)))
    }

    /// Everything strictly above `value`.
    pub fn greater_than(value: ScalarValue) -> Self {
        Self {
            values: typed_values!(value, |v| ValueSet::of_range(
                std::ops::Bound::Excluded(v),
                std::ops::Bound::Unbounded
            )),
            null_allowed: false,
        }
    }

    /// Everything at or above `value`.
    pub fn greater_than_or_equal(value: ScalarValue) -> Self {
        Self {
            values: typed_values!(value, |v| ValueSet::of_range(
                std::ops::Bound::Included(v),
                std::ops::Bound::Unbounded
            )),
            null_allowed: false,
        }
    }

    /// Everything strictly below `value`.
    pub fn less_than(value: ScalarValue) -> Self {
        Self {
            values: typed_values!(value, |v| ValueSet::of_range(
                std::ops::Bound::Unbounded,
                std::ops::Bound::Excluded(v)
            )),
            null_allowed: false,
        }
    }

    /// Everything at or below `value`.
    pub fn less_than_or_equal(value: ScalarValue) -> Self {
        Self {
            values: typed_values!(value, |v| ValueSet::of_range(
                std::ops::Bound::Unbounded,
                std::ops::Bound::Included(v)
            )),
            null_allowed: false,
        }
    }

    /// The closed range `[low, high]`. Fails when the endpoints span
    /// different spaces.
    pub fn between(low: ScalarValue, high: ScalarValue) -> Result<Self, DomainError> {
        Self::greater_than_or_equal(low).intersect(&Self::less_than_or_equal(high))
    }

    /// The value space of this domain.
    pub fn scalar_type(&self) -> ScalarType {
        self.values.scalar_type()
    }

    /// Whether NULL is admitted.
    pub fn null_allowed(&self) -> bool {
        self.null_allowed
    }

    /// Whether the domain admits nothing, not even NULL.
    pub fn is_empty(&self) -> bool {
        if self.null_allowed {
            return false;
        }
        match &self.values {
            TypedValues::BigInt(set) => set.is_empty(),
            TypedValues::Double(set) => set.is_empty(),
            TypedValues::Varchar { values, .. } => values.is_empty(),
        }
    }

    /// Whether the domain admits everything, NULL included.
    pub fn is_all(&self) -> bool {
        if !self.null_allowed {
            return false;
        }
        match &self.values {
            TypedValues::BigInt(set) => set.is_all(),
            TypedValues::Double(set) => set.is_all(),
            TypedValues::Varchar { values, .. } => values.is_all(),
        }
    }

    /// Values admitted by both domains.
    pub fn intersect(&self, other: &Self) -> Result<Self, DomainError> {
        Ok(Self {
            values: zip_values!(&self.values, &other.values, |x: &ValueSet<_>, y| x
                .intersect(y))?,
            null_allowed: self.null_allowed && other.null_allowed,
        })
    }

    /// Values admitted by either domain.
    pub fn union(&self, other: &Self) -> Result<Self, DomainError> {
        Ok(Self {
            values: zip_values!(&self.values, &other.values, |x: &ValueSet<_>, y| x
                .union(y))?,
            null_allowed: self.null_allowed || other.null_allowed,
        })
    }

    /// Everything in the value space this domain does not admit, with the
    /// NULL bit flipped.
    pub fn complement(&self) -> Self {
        Self {
            values: self.complemented_values(),
            null_allowed: !self.null_allowed,
        }
    }

    /// Everything in the value space this domain does not admit, keeping
    /// NULL excluded. This is the shape SQL `<>` and `NOT IN` produce, since
    /// their three-valued logic never admits NULL either.
    pub fn value_complement(&self) -> Self {
        Self {
            values: self.complemented_values(),
            null_allowed: self.null_allowed,
        }
    }

    fn complemented_values(&self) -> TypedValues {
        match &self.values {
            TypedValues::BigInt(set) => TypedValues::BigInt(set.complement()),
            TypedValues::Double(set) => TypedValues::Double(set.complement()),
            TypedValues::Varchar { length, values } => TypedValues::Varchar {
                length: *length,
                values: values.complement(),
            },
        }
    }

    /// Whether every value (and NULL, if admitted) of `other` is admitted by
    /// this domain.
    pub fn contains(&self, other: &Self) -> Result<bool, DomainError> {
        if other.null_allowed && !self.null_allowed {
            return Ok(false);
        }
        match (&self.values, &other.values) {
            (TypedValues::BigInt(x), TypedValues::BigInt(y)) => Ok(x.contains(y)),
            (TypedValues::Double(x), TypedValues::Double(y)) => Ok(x.contains(y)),
            (
                TypedValues::Varchar {
                    length: la,
                    values: x,
                },
                TypedValues::Varchar {
                    length: lb,
                    values: y,
                },
            ) if la == lb => Ok(x.contains(y)),
            (a, b) => Err(DomainError(a.scalar_type(), b.scalar_type())),
        }
    }

    /// Whether (non-NULL) `value` is admitted.
    pub fn contains_value(&self, value: &ScalarValue) -> bool {
        match (&self.values, value) {
            (TypedValues::BigInt(set), ScalarValue::BigInt(v)) => set.contains_value(v),
            (TypedValues::Double(set), ScalarValue::Double(v)) => set.contains_value(v),
            (TypedValues::Varchar { length, values }, ScalarValue::Varchar(s))
                if *length == s.chars().count() =>
            {
                values.contains_value(s)
            }
            _ => false,
        }
    }

    /// The ranges of this domain with endpoints lifted back to [`ScalarValue`].
    pub fn value_ranges(
        &self,
    ) -> Vec<(std::ops::Bound<ScalarValue>, std::ops::Bound<ScalarValue>)> {
        use std::ops::Bound;
        fn lift<T: Ord + Clone>(
            bound: &Bound<T>,
            wrap: impl Fn(T) -> ScalarValue,
        ) -> Bound<ScalarValue> {
            match bound {
                Bound::Unbounded => Bound::Unbounded,
                Bound::Included(v) => Bound::Included(wrap(v.clone())),
                Bound::Excluded(v) => Bound::Excluded(wrap(v.clone())),
            }
        }
        match &self.values {
            TypedValues::BigInt(set) => set
                .ranges()
                .iter()
                .map(|r| {
                    (
                        lift(r.low(), ScalarValue::BigInt),
                        lift(r.high(), ScalarValue::BigInt),
                    )
                })
                .collect_vec(),
            TypedValues::Double(set) => set
                .ranges()
                .iter()
                .map(|r| {
                    (
                        lift(r.low(), ScalarValue::Double),
                        lift(r.high(), ScalarValue::Double),
                    )
                })
                .collect_vec(),
            TypedValues::Varchar { values, .. } => values
                .ranges()
                .iter()
                .map(|r| {
                    (
                        lift(r.low(), ScalarValue::Varchar),
                        lift(r.high(), ScalarValue::Varchar),
                    )
                })
                .collect_vec(),
        }
    }
}

/// A conjunctive per-column description of the rows a predicate admits.
///
/// `TupleDomain::none()` is the always-false domain; columns absent from a
/// non-none tuple domain are unconstrained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleDomain {
    domains: Option<BTreeMap<String, Domain>>,
}

impl TupleDomain {
    /// The domain admitting every row.
    pub fn all() -> Self {
        Self {
            domains: Some(BTreeMap::new()),
        }
    }

    /// The domain admitting no row.
    pub fn none() -> Self {
        Self { domains: None }
    }

    /// Build from per-column domains. Collapses to `none` when any column's
    /// domain is empty, and drops columns whose domain is unconstrained.
    pub fn from_column_domains(
        columns: impl IntoIterator<Item = (String, Domain)>,
    ) -> Self {
        let mut map = BTreeMap::new();
        for (column, domain) in columns {
            if domain.is_empty() {
                return Self::none();
            }
            if domain.is_all() {
                continue;
            }
            map.insert(column, domain);
        }
        Self { domains: Some(map) }
    }

    /// Whether this is the always-false domain.
    pub fn is_none(&self) -> bool {
        self.domains.is_none()
    }

    /// Whether this domain admits every row.
    pub fn is_all(&self) -> bool {
        self.domains.as_ref().is_some_and(|map| map.is_empty())
    }

    /// The per-column domains, or `None` for the always-false domain.
    pub fn domains(&self) -> Option<&BTreeMap<String, Domain>> {
        self.domains.as_ref()
    }

    /// Rows admitted by both domains (logical AND).
    pub fn intersect(&self, other: &Self) -> Result<Self, DomainError> {
        let (a, b) = match (&self.domains, &other.domains) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(Self::none()),
        };
        let mut out = a.clone();
        for (column, domain) in b {
            let merged = match out.get(column) {
                Some(existing) => existing.intersect(domain)?,
                None => domain.clone(),
            };
            if merged.is_empty() {
                return Ok(Self::none());
            }
            out.insert(column.clone(), merged);
        }
        Ok(Self { domains: Some(out) })
    }

    /// The union of two tuple domains, in the cases where it is exactly
    /// representable column-wise: equal operands, one side containing the
    /// other, or both sides constraining the same single column. Returns
    /// `None` otherwise, including when the sides live in mismatched value
    /// spaces.
    pub fn column_wise_union(&self, other: &Self) -> Option<Self> {
        if self.is_none() {
            return Some(other.clone());
        }
        if other.is_none() {
            return Some(self.clone());
        }
        if self == other || self.contains(other).unwrap_or(false) {
            return Some(self.clone());
        }
        if other.contains(self).unwrap_or(false) {
            return Some(other.clone());
        }
        let (a, b) = (self.domains.as_ref()?, other.domains.as_ref()?);
        if a.len() == 1 && b.len() == 1 {
            let (column_a, domain_a) = a.iter().next()?;
            let (column_b, domain_b) = b.iter().next()?;
            if column_a == column_b {
                let unioned = domain_a.union(domain_b).ok()?;
                return Some(Self::from_column_domains([(column_a.clone(), unioned)]));
            }
        }
        None
    }

    /// Whether every row admitted by `other` is admitted by this domain.
    pub fn contains(&self, other: &Self) -> Result<bool, DomainError> {
        if other.is_none() {
            return Ok(true);
        }
        let own = match &self.domains {
            None => return Ok(false),
            Some(map) => map,
        };
        let theirs = other.domains.as_ref().expect("checked non-none above");
        for (column, domain) in own {
            match theirs.get(column) {
                // The other side leaves the column unconstrained while we
                // restrict it.
                None => return Ok(false),
                Some(their_domain) => {
                    if !domain.contains(their_domain)? {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn bigint(v: i64) -> ScalarValue {
        ScalarValue::BigInt(v)
    }

    fn varchar(s: &str) -> ScalarValue {
        ScalarValue::Varchar(s.to_string())
    }

    #[test]
    fn test_domain_point_and_ranges() {
        let five = Domain::point(bigint(5));
        assert!(five.contains_value(&bigint(5)));
        assert!(!five.contains_value(&bigint(4)));
        assert!(!five.null_allowed());

        let at_least_five = Domain::greater_than_or_equal(bigint(5));
        assert!(at_least_five.contains(&five).unwrap());
        assert!(!Domain::greater_than(bigint(5)).contains(&five).unwrap());
    }

    #[test]
    fn test_mismatched_spaces_fail() {
        let ints = Domain::point(bigint(5));
        let doubles = Domain::point(ScalarValue::Double(5.0.into()));
        assert!(ints.intersect(&doubles).is_err());

        // Strings of different declared lengths live in different spaces.
        let apples = Domain::point(varchar("apples"));
        let apple = Domain::point(varchar("apple"));
        assert!(apples.union(&apple).is_err());
        assert!(apples.contains(&apple).is_err());
        // Same length works.
        let banana = Domain::point(varchar("banana"));
        assert!(banana
            .value_complement()
            .contains(&apples)
            .unwrap());
    }

    #[test]
    fn test_null_bit() {
        let all = Domain::all(ScalarType::BigInt);
        let not_five = Domain::point(bigint(5)).value_complement();
        // An unconstrained column admits NULL; a <> filter does not, so the
        // filter never contains the unconstrained domain.
        assert!(all.contains(&not_five).unwrap());
        assert!(!not_five.contains(&all).unwrap());
        // complement() flips the NULL bit, value_complement() keeps it.
        assert!(Domain::point(bigint(5)).complement().null_allowed());
        assert!(!not_five.null_allowed());
    }

    #[test]
    fn test_points_dedup_and_empty() {
        let dup = Domain::points([bigint(5), bigint(5), bigint(7)]).unwrap();
        assert_eq!(dup, Domain::points([bigint(7), bigint(5)]).unwrap());
        assert!(Domain::points(Vec::new()).unwrap().is_empty());
        assert!(Domain::points([varchar("USA"), varchar("apples")]).is_err());
    }

    #[test]
    fn test_tuple_domain_intersect() {
        let a5 = TupleDomain::from_column_domains([("a".to_string(), Domain::point(bigint(5)))]);
        let b7 = TupleDomain::from_column_domains([("b".to_string(), Domain::point(bigint(7)))]);
        let both = a5.intersect(&b7).unwrap();
        assert!(both.contains(&TupleDomain::none()).unwrap());
        assert!(a5.contains(&both).unwrap());
        assert!(b7.contains(&both).unwrap());
        assert!(!both.contains(&a5).unwrap());

        // a = 5 AND a > 5 is unsatisfiable
        let above = TupleDomain::from_column_domains([(
            "a".to_string(),
            Domain::greater_than(bigint(5)),
        )]);
        assert!(a5.intersect(&above).unwrap().is_none());
    }

    #[test]
    fn test_tuple_domain_union_exact_cases() {
        let a5 = TupleDomain::from_column_domains([("a".to_string(), Domain::point(bigint(5)))]);
        let a7 = TupleDomain::from_column_domains([("a".to_string(), Domain::point(bigint(7)))]);
        let union = a5.column_wise_union(&a7).unwrap();
        assert!(union.contains(&a5).unwrap());
        assert!(union.contains(&a7).unwrap());

        // One side containing the other is exact too.
        let ge5 = TupleDomain::from_column_domains([(
            "a".to_string(),
            Domain::greater_than_or_equal(bigint(5)),
        )]);
        assert_eq!(ge5.column_wise_union(&a5), Some(ge5.clone()));

        // Cross-column unions are not representable.
        let b3 = TupleDomain::from_column_domains([("b".to_string(), Domain::point(bigint(3)))]);
        assert_eq!(a5.column_wise_union(&b3), None);
    }

    #[test]
    fn test_tuple_domain_containment_monotonicity() {
        let narrow = TupleDomain::from_column_domains([
            ("a".to_string(), Domain::point(bigint(5))),
            ("b".to_string(), Domain::greater_than(bigint(9))),
        ]);
        let wide = TupleDomain::from_column_domains([(
            "a".to_string(),
            Domain::greater_than(bigint(0)),
        )]);
        assert!(wide.contains(&narrow).unwrap());
        assert!(!narrow.contains(&wide).unwrap());
        assert!(TupleDomain::all().contains(&narrow).unwrap());
        assert!(!narrow.contains(&TupleDomain::all()).unwrap());
    }
}
