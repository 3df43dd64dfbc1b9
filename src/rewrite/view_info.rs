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

//! Extraction of a normalized summary from a materialized view definition.

use std::collections::{HashMap, HashSet};

use sqlparser::ast::{
    Distinct, Expr, GroupByExpr, Ident, ObjectName, Query, SelectItem, SetExpr,
};

use crate::error::SemanticError;

use super::util::bare_table_name;

/// The normalized, immutable summary of a materialized view definition:
/// everything the rewriter needs to know about a view, extracted once when
/// the view is registered and consulted read-only per query.
///
/// Projections are recorded in both directions. `base_to_view` maps each
/// projected *expression* (not just bare columns — `SUM(a * b + c)` is a
/// perfectly good key) to the name the view exposes it under: the alias when
/// one is written, otherwise the expression's own rendering. `view_to_base`
/// is the inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewInfo {
    base_table: ObjectName,
    base_to_view: HashMap<Expr, Ident>,
    view_to_base: HashMap<Ident, Expr>,
    where_clause: Option<Expr>,
    group_by: HashSet<Expr>,
    is_distinct: bool,
}

impl ViewInfo {
    /// Extract a [`ViewInfo`] from a view definition.
    ///
    /// Definitions using shapes the rewriter cannot see through are rejected
    /// with a `NOT_SUPPORTED` error: set operations, CTEs, LIMIT, HAVING,
    /// `SELECT *`, DISTINCT ON, joins, subqueries, table functions, table
    /// aliases, more than one table, grouping by anything the view does not
    /// project, and grouping-set modifiers. A view that fails extraction
    /// cannot back the rewrite of any query.
    pub fn from_query(query: &Query) -> Result<Self, SemanticError> {
        if let Some(with) = &query.with {
            return Err(SemanticError::not_supported(
                with,
                "WITH clause is not supported in view definitions",
            ));
        }
        if query.limit_clause.is_some() || query.fetch.is_some() {
            return Err(SemanticError::not_supported(
                query,
                "Limit clause is not supported in view definitions",
            ));
        }
        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select,
            other => {
                return Err(SemanticError::not_supported(
                    other,
                    "View definition must be a single query specification",
                ))
            }
        };
        if let Some(having) = &select.having {
            return Err(SemanticError::not_supported(
                having,
                "Having clause is not supported in view definitions",
            ));
        }
        if select.top.is_some()
            || select.into.is_some()
            || !select.lateral_views.is_empty()
            || select.qualify.is_some()
        {
            return Err(SemanticError::not_supported(
                select,
                "Unsupported clause in view definition",
            ));
        }

        let is_distinct = match &select.distinct {
            None => false,
            Some(Distinct::Distinct) => true,
            Some(on @ Distinct::On(_)) => {
                return Err(SemanticError::not_supported(
                    on,
                    "DISTINCT ON is not supported in view definitions",
                ))
            }
        };

        if select.from.len() != 1 {
            return Err(SemanticError::not_supported(
                select,
                "Only a single base table is supported in view definitions",
            ));
        }
        let table_with_joins = &select.from[0];
        if !table_with_joins.joins.is_empty() {
            return Err(SemanticError::not_supported(
                table_with_joins,
                "Joins are not supported in view definitions",
            ));
        }
        let base_table = match bare_table_name(&table_with_joins.relation) {
            Some(name) => name.clone(),
            None => {
                return Err(SemanticError::not_supported(
                    &table_with_joins.relation,
                    "Relation other than a bare table is not supported in view definitions",
                ))
            }
        };

        let mut base_to_view = HashMap::new();
        let mut view_to_base = HashMap::new();
        for item in &select.projection {
            let (expr, name) = match item {
                SelectItem::UnnamedExpr(expr) => (expr, Ident::new(expr.to_string())),
                SelectItem::ExprWithAlias { expr, alias } => (expr, alias.clone()),
                other => {
                    return Err(SemanticError::not_supported(
                        other,
                        "All-columns projections are not supported in view definitions",
                    ))
                }
            };
            // Duplicate output names overwrite; semantic analysis upstream
            // rejects duplicate aliases before a view ever gets here.
            base_to_view.insert(expr.clone(), name.clone());
            view_to_base.insert(name, expr.clone());
        }

        let mut group_by = HashSet::new();
        match &select.group_by {
            GroupByExpr::Expressions(exprs, modifiers) => {
                if !modifiers.is_empty() {
                    return Err(SemanticError::not_supported(
                        &select.group_by,
                        "Grouping modifiers are not supported in view definitions",
                    ));
                }
                for expr in exprs {
                    // Grouping keys are stored in base-table terms: a key
                    // written as the view's own output name resolves back to
                    // the expression it projects.
                    if base_to_view.contains_key(expr) {
                        group_by.insert(expr.clone());
                    } else if let Expr::Identifier(ident) = expr {
                        match view_to_base.get(ident) {
                            Some(base_expr) => {
                                group_by.insert(base_expr.clone());
                            }
                            None => {
                                return Err(SemanticError::not_supported(
                                    expr,
                                    "View definition does not project this grouping key",
                                ))
                            }
                        }
                    } else {
                        return Err(SemanticError::not_supported(
                            expr,
                            "View definition does not project this grouping key",
                        ));
                    }
                }
            }
            other @ GroupByExpr::All(_) => {
                return Err(SemanticError::not_supported(
                    other,
                    "GROUP BY ALL is not supported in view definitions",
                ))
            }
        }

        let info = Self {
            base_table,
            base_to_view,
            view_to_base,
            where_clause: select.selection.clone(),
            group_by,
            is_distinct,
        };
        debug_assert!(
            info.view_to_base
                .values()
                .all(|expr| info.base_to_view.contains_key(expr)),
            "baseToView and viewToBase out of sync"
        );
        debug_assert!(
            info.group_by
                .iter()
                .all(|expr| info.base_to_view.contains_key(expr)),
            "grouping key does not resolve through baseToView"
        );
        Ok(info)
    }

    /// The single table the view reads from.
    pub fn base_table(&self) -> &ObjectName {
        &self.base_table
    }

    /// The view's WHERE predicate, if any.
    pub fn where_clause(&self) -> Option<&Expr> {
        self.where_clause.as_ref()
    }

    /// The view's grouping keys, in base-table terms. Held as a set; the
    /// original ordering of the GROUP BY list is not preserved.
    pub fn group_by(&self) -> &HashSet<Expr> {
        &self.group_by
    }

    /// Whether the view aggregates its base table.
    pub fn has_group_by(&self) -> bool {
        !self.group_by.is_empty()
    }

    /// Whether the view's SELECT is DISTINCT.
    pub fn is_distinct(&self) -> bool {
        self.is_distinct
    }

    /// The name the view exposes `expr` under, when `expr` is one of its
    /// projections. Matching is structural over the whole expression.
    pub fn view_column(&self, expr: &Expr) -> Option<&Ident> {
        self.base_to_view.get(expr)
    }

    /// The base expression a view-exposed column is defined by.
    pub fn base_expr(&self, name: &Ident) -> Option<&Expr> {
        self.view_to_base.get(name)
    }

    /// Whether `name` is one of the view's output columns.
    pub fn exposes_column(&self, name: &Ident) -> bool {
        self.view_to_base.contains_key(name)
    }
}
