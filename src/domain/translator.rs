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

//! Translation between predicate expressions and tuple domains.
//!
//! [`DomainTranslator::from_predicate`] turns a WHERE expression into a
//! [`TupleDomain`], or reports that the expression cannot be modeled exactly.
//! The translation is exact or absent, never approximate: an
//! over-approximated domain on the view side would admit rewrites that change
//! query results, so anything the model cannot capture precisely comes back
//! as `None` and the caller gives up on the affected predicate.
//!
//! Covered shapes: `column op literal` for the six comparison operators (in
//! either operand order), `BETWEEN`, `IN`/`NOT IN` over literal lists, `AND`,
//! `NOT` (pushed to the leaves by De Morgan), boolean literals, and the `OR`
//! cases whose union stays exactly representable column-wise. Literal types
//! come from the metadata oracle; an unknown column makes the predicate
//! untranslatable.

use ordered_float::OrderedFloat;
use sqlparser::ast::{
    BinaryOperator, Expr, Ident, ObjectName, UnaryOperator, Value, ValueWithSpan,
};
use sqlparser::tokenizer::Span;

use crate::metadata::{MetadataSource, Session, SqlType};

use super::tuple_domain::{Domain, ScalarValue, TupleDomain};

/// Translates predicates over a single table into [`TupleDomain`] form and
/// back, resolving column types through the metadata oracle.
pub struct DomainTranslator<'a> {
    metadata: &'a dyn MetadataSource,
    session: &'a Session,
}

impl<'a> DomainTranslator<'a> {
    /// A translator resolving columns through `metadata` on behalf of `session`.
    pub fn new(metadata: &'a dyn MetadataSource, session: &'a Session) -> Self {
        Self { metadata, session }
    }

    /// Translate `predicate` (over columns of `table`) into a tuple domain.
    /// Returns `None` when the predicate cannot be modeled exactly.
    pub fn from_predicate(&self, table: &ObjectName, predicate: &Expr) -> Option<TupleDomain> {
        self.extract(table, predicate, false)
    }

    fn extract(&self, table: &ObjectName, expr: &Expr, complement: bool) -> Option<TupleDomain> {
        match expr {
            Expr::Nested(inner) => self.extract(table, inner, complement),
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: inner,
            } => self.extract(table, inner, !complement),
            Expr::Value(value) => match &value.value {
                Value::Boolean(b) => Some(if *b != complement {
                    TupleDomain::all()
                } else {
                    TupleDomain::none()
                }),
                _ => None,
            },
            Expr::BinaryOp { left, op, right } => match op {
                BinaryOperator::And | BinaryOperator::Or => {
                    // De Morgan: complementing swaps the connective.
                    let union = matches!(op, BinaryOperator::Or) != complement;
                    let lhs = self.extract(table, left, complement)?;
                    let rhs = self.extract(table, right, complement)?;
                    if union {
                        lhs.column_wise_union(&rhs)
                    } else {
                        lhs.intersect(&rhs).ok()
                    }
                }
                _ => self.comparison(table, left, op, right, complement),
            },
            Expr::InList {
                expr: needle,
                list,
                negated,
            } => self.in_list(table, needle, list, *negated != complement),
            Expr::Between {
                expr: needle,
                negated,
                low,
                high,
            } => self.between(table, needle, low, high, *negated != complement),
            _ => None,
        }
    }

    fn comparison(
        &self,
        table: &ObjectName,
        left: &Expr,
        op: &BinaryOperator,
        right: &Expr,
        complement: bool,
    ) -> Option<TupleDomain> {
        let (column, op, literal) = match (column_name(left), column_name(right)) {
            (Some(column), None) => (column, op.clone(), right),
            (None, Some(column)) => (column, swap_operands(op)?, left),
            _ => return None,
        };
        let op = if complement { negate(&op)? } else { op };
        let value = self.literal_value(table, column, literal)?;
        let domain = match op {
            BinaryOperator::Eq => Domain::point(value),
            BinaryOperator::NotEq => Domain::point(value).value_complement(),
            BinaryOperator::Lt => Domain::less_than(value),
            BinaryOperator::LtEq => Domain::less_than_or_equal(value),
            BinaryOperator::Gt => Domain::greater_than(value),
            BinaryOperator::GtEq => Domain::greater_than_or_equal(value),
            _ => return None,
        };
        Some(TupleDomain::from_column_domains([(
            column.value.clone(),
            domain,
        )]))
    }

    fn in_list(
        &self,
        table: &ObjectName,
        needle: &Expr,
        list: &[Expr],
        negated: bool,
    ) -> Option<TupleDomain> {
        let column = column_name(needle)?;
        let values = list
            .iter()
            .map(|item| self.literal_value(table, column, item))
            .collect::<Option<Vec<_>>>()?;
        let domain = Domain::points(values).ok()?;
        let domain = if negated {
            domain.value_complement()
        } else {
            domain
        };
        Some(TupleDomain::from_column_domains([(
            column.value.clone(),
            domain,
        )]))
    }

    fn between(
        &self,
        table: &ObjectName,
        needle: &Expr,
        low: &Expr,
        high: &Expr,
        negated: bool,
    ) -> Option<TupleDomain> {
        let column = column_name(needle)?;
        let low = self.literal_value(table, column, low)?;
        let high = self.literal_value(table, column, high)?;
        let domain = Domain::between(low, high).ok()?;
        let domain = if negated {
            domain.value_complement()
        } else {
            domain
        };
        Some(TupleDomain::from_column_domains([(
            column.value.clone(),
            domain,
        )]))
    }

    /// Type a literal against the declared type of `column`, folding a
    /// leading unary minus on numbers.
    fn literal_value(&self, table: &ObjectName, column: &Ident, expr: &Expr) -> Option<ScalarValue> {
        let column_type = self
            .metadata
            .column_type(self.session, table, &column.value)?;
        let (value, negated) = match expr {
            Expr::Value(v) => (&v.value, false),
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr: inner,
            } => match inner.as_ref() {
                Expr::Value(v) => (&v.value, true),
                _ => return None,
            },
            _ => return None,
        };
        match (column_type, value) {
            (SqlType::BigInt, Value::Number(raw, _)) => {
                let parsed: i64 = raw.parse().ok()?;
                Some(ScalarValue::BigInt(if negated { -parsed } else { parsed }))
            }
            (SqlType::Double, Value::Number(raw, _)) => {
                let parsed: f64 = raw.parse().ok()?;
                Some(ScalarValue::Double(OrderedFloat(if negated {
                    -parsed
                } else {
                    parsed
                })))
            }
            (SqlType::Varchar | SqlType::Date, Value::SingleQuotedString(s)) if !negated => {
                Some(ScalarValue::Varchar(s.clone()))
            }
            _ => None,
        }
    }

    /// Render a tuple domain back into predicate form. NULL admissibility is
    /// not representable without IS NULL terms and is dropped; the result is
    /// meant for display and sanity checks, not for re-deriving domains of
    /// record.
    pub fn to_predicate(&self, tuple: &TupleDomain) -> Expr {
        let domains = match tuple.domains() {
            None => return boolean_literal(false),
            Some(map) => map,
        };
        domains
            .iter()
            .map(|(column, domain)| domain_to_predicate(column, domain))
            .reduce(|a, b| binary(a, BinaryOperator::And, b))
            .unwrap_or_else(|| boolean_literal(true))
    }
}

/// The identifier of a bare column reference, unwrapping parentheses.
fn column_name(expr: &Expr) -> Option<&Ident> {
    match expr {
        Expr::Identifier(ident) => Some(ident),
        Expr::Nested(inner) => column_name(inner),
        _ => None,
    }
}

/// Rewrite `literal op column` as `column op' literal`.
fn swap_operands(op: &BinaryOperator) -> Option<BinaryOperator> {
    Some(match op {
        BinaryOperator::Eq => BinaryOperator::Eq,
        BinaryOperator::NotEq => BinaryOperator::NotEq,
        BinaryOperator::Lt => BinaryOperator::Gt,
        BinaryOperator::LtEq => BinaryOperator::GtEq,
        BinaryOperator::Gt => BinaryOperator::Lt,
        BinaryOperator::GtEq => BinaryOperator::LtEq,
        _ => return None,
    })
}

/// The comparison holding exactly when `op` does not.
fn negate(op: &BinaryOperator) -> Option<BinaryOperator> {
    Some(match op {
        BinaryOperator::Eq => BinaryOperator::NotEq,
        BinaryOperator::NotEq => BinaryOperator::Eq,
        BinaryOperator::Lt => BinaryOperator::GtEq,
        BinaryOperator::LtEq => BinaryOperator::Gt,
        BinaryOperator::Gt => BinaryOperator::LtEq,
        BinaryOperator::GtEq => BinaryOperator::Lt,
        _ => return None,
    })
}

fn domain_to_predicate(column: &str, domain: &Domain) -> Expr {
    use std::ops::Bound;

    let ranges = domain.value_ranges();
    if ranges.is_empty() {
        return boolean_literal(false);
    }
    ranges
        .into_iter()
        .map(|(low, high)| {
            if let (Bound::Included(a), Bound::Included(b)) = (&low, &high) {
                if a == b {
                    return binary(column_ref(column), BinaryOperator::Eq, literal(a.clone()));
                }
            }
            let mut parts = vec![];
            match low {
                Bound::Unbounded => {}
                Bound::Included(v) => {
                    parts.push(binary(column_ref(column), BinaryOperator::GtEq, literal(v)))
                }
                Bound::Excluded(v) => {
                    parts.push(binary(column_ref(column), BinaryOperator::Gt, literal(v)))
                }
            }
            match high {
                Bound::Unbounded => {}
                Bound::Included(v) => {
                    parts.push(binary(column_ref(column), BinaryOperator::LtEq, literal(v)))
                }
                Bound::Excluded(v) => {
                    parts.push(binary(column_ref(column), BinaryOperator::Lt, literal(v)))
                }
            }
            parts
                .into_iter()
                .reduce(|a, b| binary(a, BinaryOperator::And, b))
                .unwrap_or_else(|| boolean_literal(true))
        })
        .reduce(|a, b| binary(a, BinaryOperator::Or, b))
        .expect("at least one range")
}

fn column_ref(name: &str) -> Expr {
    Expr::Identifier(Ident::new(name))
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn literal(value: ScalarValue) -> Expr {
    let value = match value {
        ScalarValue::BigInt(v) => Value::Number(v.to_string(), false),
        ScalarValue::Double(v) => Value::Number(v.to_string(), false),
        ScalarValue::Varchar(s) => Value::SingleQuotedString(s),
    };
    Expr::Value(ValueWithSpan {
        value,
        span: Span::empty(),
    })
}

fn boolean_literal(b: bool) -> Expr {
    Expr::Value(ValueWithSpan {
        value: Value::Boolean(b),
        span: Span::empty(),
    })
}

#[cfg(test)]
mod test {
    use sqlparser::ast::{ObjectNamePart, SetExpr, Statement};
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    use crate::metadata::SchemaMetadata;

    use super::*;

    fn table() -> ObjectName {
        ObjectName(vec![ObjectNamePart::Identifier(Ident::new("t1"))])
    }

    fn metadata() -> SchemaMetadata {
        SchemaMetadata::new().with_table(
            "t1",
            [
                ("a", SqlType::BigInt),
                ("b", SqlType::Varchar),
                ("c", SqlType::Double),
                ("d", SqlType::Date),
            ],
        )
    }

    fn parse_predicate(sql: &str) -> Expr {
        let statements =
            Parser::parse_sql(&GenericDialect {}, &format!("SELECT a FROM t1 WHERE {sql}"))
                .expect("predicate parses");
        match statements.into_iter().next() {
            Some(Statement::Query(query)) => match *query.body {
                SetExpr::Select(select) => select.selection.expect("has selection"),
                other => panic!("not a select: {other}"),
            },
            other => panic!("not a query: {other:?}"),
        }
    }

    fn domain_of(sql: &str) -> Option<TupleDomain> {
        let metadata = metadata();
        let session = Session::new();
        DomainTranslator::new(&metadata, &session).from_predicate(&table(), &parse_predicate(sql))
    }

    #[test]
    fn test_comparisons() {
        let eq = domain_of("a = 5").unwrap();
        assert!(domain_of("a >= 5").unwrap().contains(&eq).unwrap());
        assert!(domain_of("a > 3").unwrap().contains(&eq).unwrap());
        assert!(!domain_of("a > 5").unwrap().contains(&eq).unwrap());
        assert!(domain_of("a <> 4").unwrap().contains(&eq).unwrap());
        // literal-first spelling swaps onto the column
        assert_eq!(domain_of("5 = a"), Some(eq));
        assert_eq!(domain_of("5 > a"), domain_of("a < 5"));
    }

    #[test]
    fn test_conjunction_and_negation() {
        // a = 5 AND a > 0 pins down to a = 5
        assert_eq!(domain_of("a = 5 AND a > 0"), domain_of("a = 5"));
        // contradiction collapses to none
        assert!(domain_of("a < 5 AND a > 5").unwrap().is_none());
        // NOT distributes into the leaves
        assert_eq!(domain_of("NOT (a = 5)"), domain_of("a <> 5"));
        assert_eq!(domain_of("NOT (a < 5 OR a > 7)"), domain_of("a >= 5 AND a <= 7"));
    }

    #[test]
    fn test_disjunction_single_column_is_exact() {
        let in_list = domain_of("a IN (5, 6)").unwrap();
        assert_eq!(domain_of("a = 5 OR a = 6"), Some(in_list));
        assert_eq!(domain_of("a < 5 OR a > 5"), domain_of("a <> 5"));
        // a cross-column disjunction is not representable
        assert_eq!(domain_of("a = 5 OR b = 'x'"), None);
    }

    #[test]
    fn test_in_lists() {
        let not_in = domain_of("a NOT IN (5, 6)").unwrap();
        assert!(not_in.contains(&domain_of("a < 5").unwrap()).unwrap());
        assert!(!not_in.contains(&domain_of("a <= 5").unwrap()).unwrap());
        assert_eq!(domain_of("NOT (a IN (5, 6))"), Some(not_in));
        assert_eq!(
            domain_of("b IN ('USA', 'CAN')"),
            domain_of("b = 'CAN' OR b = 'USA'")
        );
    }

    #[test]
    fn test_between_and_negative_literals() {
        assert_eq!(domain_of("a BETWEEN 3 AND 7"), domain_of("a >= 3 AND a <= 7"));
        assert_eq!(domain_of("a NOT BETWEEN 3 AND 7"), domain_of("a < 3 OR a > 7"));
        let neg = domain_of("a > -5").unwrap();
        assert!(neg.contains(&domain_of("a = -4").unwrap()).unwrap());
        assert!(!neg.contains(&domain_of("a = -5").unwrap()).unwrap());
    }

    #[test]
    fn test_typed_literals() {
        // doubles and dates resolve through the oracle's column types
        assert!(domain_of("c > 5.0")
            .unwrap()
            .contains(&domain_of("c = 5.01").unwrap())
            .unwrap());
        assert!(domain_of("d >= '2000-01-01'")
            .unwrap()
            .contains(&domain_of("d = '2000-06-15'").unwrap())
            .unwrap());
        // string lengths are part of the value space; mixing them is not
        // modelable
        assert!(domain_of("b <> 'banana'")
            .unwrap()
            .contains(&domain_of("b = 'apple'").unwrap())
            .is_err());
    }

    #[test]
    fn test_untranslatable_predicates() {
        // unknown column
        assert_eq!(domain_of("z = 5"), None);
        // type mismatch between literal and column
        assert_eq!(domain_of("a = 'five'"), None);
        assert_eq!(domain_of("a = 5.5"), None);
        // non-literal comparisons
        assert_eq!(domain_of("a = b"), None);
        assert_eq!(domain_of("a + 1 = 5"), None);
        // boolean literals are the only leaf exceptions
        assert!(domain_of("true").unwrap().is_all());
        assert!(domain_of("false").unwrap().is_none());
    }

    #[test]
    fn test_round_trip_through_predicate_form() {
        let metadata = metadata();
        let session = Session::new();
        let translator = DomainTranslator::new(&metadata, &session);
        for sql in [
            "a = 5",
            "a <> 5",
            "a > 3 AND a <= 9",
            "a IN (3, 5, 7)",
            "a = 5 AND c > 2.5",
        ] {
            let domain = translator
                .from_predicate(&table(), &parse_predicate(sql))
                .unwrap();
            let rendered = translator.to_predicate(&domain);
            let reparsed = translator.from_predicate(&table(), &rendered);
            assert_eq!(reparsed, Some(domain), "round-tripping {sql}");
        }
    }
}
