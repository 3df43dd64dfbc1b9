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

//! The filter containment test.
//!
//! A view can only answer a query when every row the query wants is present
//! in the view, i.e. when the query's WHERE predicate implies the view's.
//! The test works symbolically on [`TupleDomain`]s: both predicates are split
//! into top-level OR terms, each term is translated exactly into domain form,
//! and each query term must land inside the view's row set.
//!
//! For the view side, two shapes of evidence are accepted. When the view's
//! terms union exactly (single shared column, or one term absorbing another),
//! the query term is checked against the merged domain — this is what makes
//! `a > 5 OR a < 5` cover `a NOT IN (5)`. Otherwise each query term must fit
//! inside some single view term, which still decides cases like
//! `a < 3 OR b > 9` covering `a < 1 OR b > 11`. Both are sufficient
//! conditions only; whatever they cannot decide is reported as unknown, and
//! an unknown never becomes a rewrite.

use sqlparser::ast::{Expr, ObjectName};

use crate::domain::translator::DomainTranslator;
use crate::domain::tuple_domain::TupleDomain;

use super::util::split_disjunction;

/// Outcome of the containment test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Every row the query admits is in the view.
    Contained,
    /// Some admitted row is provably outside the view.
    NotContained,
    /// One side could not be modeled exactly; treated as not contained.
    Unknown,
}

/// Decide whether `query_where` selects only rows that `view_where` keeps.
///
/// A view without a WHERE clause holds the whole base table, so containment
/// holds trivially no matter what the query asks for.
pub fn check_containment(
    translator: &DomainTranslator<'_>,
    table: &ObjectName,
    query_where: Option<&Expr>,
    view_where: Option<&Expr>,
) -> Containment {
    let view_where = match view_where {
        None => return Containment::Contained,
        Some(expr) => expr,
    };

    let view_terms = match translate_terms(translator, table, view_where) {
        Some(terms) => terms,
        None => return Containment::Unknown,
    };
    let query_terms = match query_where {
        // No WHERE on the query side means it wants every base row,
        // including rows the view's filter may drop.
        None => vec![TupleDomain::all()],
        Some(expr) => match translate_terms(translator, table, expr) {
            Some(terms) => terms,
            None => return Containment::Unknown,
        },
    };

    let merged_view = merge_terms(&view_terms);

    let mut unknown = false;
    for query_term in &query_terms {
        let verdict = match &merged_view {
            Some(view) => view.contains(query_term).map_err(|_| ()),
            None => {
                // No exact union; accept the term if any single view term
                // absorbs it.
                let mut any_unknown = false;
                let mut found = false;
                for view_term in &view_terms {
                    match view_term.contains(query_term) {
                        Ok(true) => {
                            found = true;
                            break;
                        }
                        Ok(false) => {}
                        Err(_) => any_unknown = true,
                    }
                }
                if found {
                    Ok(true)
                } else if any_unknown {
                    Err(())
                } else {
                    Ok(false)
                }
            }
        };
        match verdict {
            Ok(true) => {}
            Ok(false) => return Containment::NotContained,
            Err(_) => unknown = true,
        }
    }
    if unknown {
        Containment::Unknown
    } else {
        Containment::Contained
    }
}

/// Translate each top-level OR term of `predicate`; `None` when any term
/// cannot be modeled exactly.
fn translate_terms(
    translator: &DomainTranslator<'_>,
    table: &ObjectName,
    predicate: &Expr,
) -> Option<Vec<TupleDomain>> {
    split_disjunction(predicate)
        .into_iter()
        .map(|term| translator.from_predicate(table, term))
        .collect()
}

/// Fold a term list into a single exact union, when one exists.
fn merge_terms(terms: &[TupleDomain]) -> Option<TupleDomain> {
    let (first, rest) = terms.split_first()?;
    rest.iter()
        .try_fold(first.clone(), |acc, term| acc.column_wise_union(term))
}
