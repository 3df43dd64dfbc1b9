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

/*!

Query rewriting against materialized views.

Given a materialized view defined by a SQL query over a base table, a target
table under which the view's contents are physically queryable, and an
incoming query against the same base table, [`QueryRewriter::rewrite`] decides
whether the query can be answered by reading the view instead, and if so
returns the query with every expression transposed through the view's select
list and the FROM clause pointed at the target table.

The rewrite is all-or-nothing and opportunistic: any query the rewriter
cannot prove equivalent comes back unchanged, so calling it can never alter
query semantics. Only view *registration* can fail, when the view definition
itself uses unsupported shapes (see [`ViewInfo::from_query`]).

# Example

Consider a view `mv` materializing

```sql
SELECT SUM(a * b + c) AS mv_sum, d, e FROM t1 WHERE a > 0 GROUP BY d, e
```

and the incoming query

```sql
SELECT SUM(a * b + c), d, e FROM t1 WHERE a > 5 AND d = 'x' GROUP BY d, e
```

Three things have to hold before the query may read `mv`:

1. Every expression the query mentions must be expressible from the view's
   select list. `SUM(a * b + c)` matches a view projection structurally and
   becomes a re-aggregation `SUM(mv_sum)`; `d` and `e` pass through.
2. The query's filter must be *contained* in the view's: every row satisfying
   `a > 5 AND d = 'x'` also satisfies `a > 0`, which the
   [domain model](crate::domain) proves symbolically.
3. The shapes must be compatible: same single base table, no joins or
   subqueries, and DISTINCT/GROUP BY usage that the view can still answer.

All three hold here, so the rewriter emits

```sql
SELECT SUM(mv_sum), d, e FROM mv WHERE a > 5 AND d = 'x' GROUP BY d, e
```

with the WHERE and GROUP BY columns likewise transposed into view terms.

*/

use dashmap::DashMap;
use sqlparser::ast::{
    Distinct, Expr, GroupByExpr, LimitClause, ObjectName, OrderByExpr, OrderByKind, Query,
    SelectItem, SetExpr, TableFactor,
};

use crate::domain::translator::DomainTranslator;
use crate::error::SemanticError;
use crate::metadata::{MetadataSource, Session};
use crate::MaterializedConfig;

/// The filter containment test.
pub mod containment;

/// Rewriting expressions from base-table terms into view terms.
pub mod expression;

/// Extraction of a normalized summary from a materialized view definition.
pub mod view_info;

mod util;

use containment::{check_containment, Containment};
use expression::ExpressionRewriter;
use util::{bare_table_name, single_select};
pub use view_info::ViewInfo;

/// Rewrites queries over a base table into queries over one materialized
/// view of that table.
///
/// The rewriter holds the view's extracted [`ViewInfo`] and the target table
/// the view's contents live under. It is read-only after construction and
/// may be shared across threads as long as the injected [`MetadataSource`]
/// is.
pub struct QueryRewriter<'a> {
    metadata: &'a dyn MetadataSource,
    session: &'a Session,
    target_table: ObjectName,
    view: ViewInfo,
}

impl<'a> QueryRewriter<'a> {
    /// A rewriter for an already-extracted view summary.
    pub fn new(
        metadata: &'a dyn MetadataSource,
        session: &'a Session,
        target_table: ObjectName,
        view: ViewInfo,
    ) -> Self {
        Self {
            metadata,
            session,
            target_table,
            view,
        }
    }

    /// A rewriter for the given view definition, extracting its summary
    /// first. Fails when the definition cannot back rewrites at all.
    pub fn from_view_query(
        metadata: &'a dyn MetadataSource,
        session: &'a Session,
        target_table: ObjectName,
        view_query: &Query,
    ) -> Result<Self, SemanticError> {
        Ok(Self::new(
            metadata,
            session,
            target_table,
            ViewInfo::from_query(view_query)?,
        ))
    }

    /// The view summary this rewriter substitutes against.
    pub fn view(&self) -> &ViewInfo {
        &self.view
    }

    /// Rewrite `query` to read from the view's target table, or return it
    /// unchanged when it cannot be answered by the view.
    pub fn rewrite(&self, query: &Query) -> Query {
        match self.try_rewrite(query) {
            Some(rewritten) => rewritten,
            None => {
                log::debug!(
                    "query not rewritten against {}: {query}",
                    self.target_table
                );
                query.clone()
            }
        }
    }

    fn try_rewrite(&self, query: &Query) -> Option<Query> {
        let select = single_select(query)?;
        if select.top.is_some()
            || select.into.is_some()
            || !select.lateral_views.is_empty()
            || select.qualify.is_some()
        {
            return None;
        }
        if select.from.len() != 1 || !select.from[0].joins.is_empty() {
            return None;
        }
        let from_table = bare_table_name(&select.from[0].relation)?;
        if from_table != self.view.base_table() {
            return None;
        }
        if select
            .projection
            .iter()
            .any(|item| matches!(item, SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..)))
        {
            return None;
        }
        let query_distinct = match &select.distinct {
            None => false,
            Some(Distinct::Distinct) => true,
            Some(Distinct::On(_)) => return None,
        };
        // The view has already collapsed duplicates; a non-DISTINCT query
        // cannot recover them.
        if self.view.is_distinct() && !query_distinct {
            return None;
        }
        let group_exprs = match &select.group_by {
            GroupByExpr::Expressions(exprs, modifiers) => {
                if !modifiers.is_empty() {
                    return None;
                }
                exprs
            }
            GroupByExpr::All(_) => return None,
        };
        // An aggregating view only answers aggregating queries.
        if self.view.has_group_by() && group_exprs.is_empty() && !selects_aggregate(select) {
            return None;
        }
        if let Some(LimitClause::LimitOffset { limit_by, .. }) = &query.limit_clause {
            if !limit_by.is_empty() {
                return None;
            }
        }
        log::trace!("passed preflight gates");

        let rewriter = ExpressionRewriter::new(&self.view);
        let mut new_projection = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            new_projection.push(match item {
                SelectItem::UnnamedExpr(expr) => SelectItem::UnnamedExpr(rewriter.rewrite(expr)?),
                SelectItem::ExprWithAlias { expr, alias } => SelectItem::ExprWithAlias {
                    expr: rewriter.rewrite(expr)?,
                    alias: alias.clone(),
                },
                _ => return None,
            });
        }
        let new_selection = match &select.selection {
            Some(expr) => Some(rewriter.rewrite(expr)?),
            None => None,
        };
        let new_group_by = group_exprs
            .iter()
            .map(|expr| rewriter.rewrite_grouping_key(expr))
            .collect::<Option<Vec<_>>>()?;
        let new_having = match &select.having {
            Some(expr) => Some(rewriter.rewrite(expr)?),
            None => None,
        };
        let new_order_by = match &query.order_by {
            None => None,
            Some(order_by) => {
                if order_by.interpolate.is_some() {
                    return None;
                }
                match &order_by.kind {
                    OrderByKind::Expressions(items) => {
                        let rewritten = items
                            .iter()
                            .map(|item| {
                                if item.with_fill.is_some() {
                                    return None;
                                }
                                Some(OrderByExpr {
                                    expr: rewriter.rewrite(&item.expr)?,
                                    options: item.options.clone(),
                                    with_fill: None,
                                })
                            })
                            .collect::<Option<Vec<_>>>()?;
                        Some(rewritten)
                    }
                    OrderByKind::All(_) => return None,
                }
            }
        };
        log::trace!("passed expression rewrite");

        let translator = DomainTranslator::new(self.metadata, self.session);
        match check_containment(
            &translator,
            self.view.base_table(),
            select.selection.as_ref(),
            self.view.where_clause(),
        ) {
            Containment::Contained => {}
            outcome @ (Containment::NotContained | Containment::Unknown) => {
                log::debug!("filter containment failed: {outcome:?}");
                return None;
            }
        }
        log::trace!("passed filter containment");

        let mut rewritten = query.clone();
        let select = match rewritten.body.as_mut() {
            SetExpr::Select(select) => select,
            _ => return None,
        };
        select.projection = new_projection;
        select.selection = new_selection;
        select.group_by = GroupByExpr::Expressions(new_group_by, vec![]);
        select.having = new_having;
        if let TableFactor::Table { name, .. } = &mut select.from[0].relation {
            *name = self.target_table.clone();
        }
        if let (Some(order_by), Some(items)) = (&mut rewritten.order_by, new_order_by) {
            order_by.kind = OrderByKind::Expressions(items);
        }
        Some(rewritten)
    }
}

/// Whether any select item contains a function call, the only aggregate
/// shape the rewriter handles.
fn selects_aggregate(select: &sqlparser::ast::Select) -> bool {
    fn contains_function(expr: &Expr) -> bool {
        match expr {
            Expr::Function(_) => true,
            Expr::BinaryOp { left, right, .. } => {
                contains_function(left) || contains_function(right)
            }
            Expr::UnaryOp { expr, .. } | Expr::Nested(expr) => contains_function(expr),
            Expr::InList { expr, list, .. } => {
                contains_function(expr) || list.iter().any(contains_function)
            }
            _ => false,
        }
    }
    select.projection.iter().any(|item| match item {
        SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
            contains_function(expr)
        }
        _ => false,
    })
}

/// Materialized views registered for query rewriting, keyed by their target
/// table.
///
/// Registration runs extraction and is the one place view-side problems
/// surface as errors; a view that does not extract is never consulted.
/// Rewriting tries each registered view and returns the first successful
/// rewrite, or the query unchanged.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: DashMap<String, RegisteredView>,
}

#[derive(Debug, Clone)]
struct RegisteredView {
    target_table: ObjectName,
    view: ViewInfo,
    config: MaterializedConfig,
}

impl ViewRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the materialized view queryable under `target_table`,
    /// defined by `view_query`, with default configuration.
    pub fn register(
        &self,
        target_table: ObjectName,
        view_query: &Query,
    ) -> Result<(), SemanticError> {
        self.register_with_config(target_table, view_query, MaterializedConfig::default())
    }

    /// Register a view with explicit configuration.
    pub fn register_with_config(
        &self,
        target_table: ObjectName,
        view_query: &Query,
        config: MaterializedConfig,
    ) -> Result<(), SemanticError> {
        let view = ViewInfo::from_query(view_query)?;
        self.views.insert(
            target_table.to_string(),
            RegisteredView {
                target_table,
                view,
                config,
            },
        );
        Ok(())
    }

    /// Drop the view registered under `target_table`, if any.
    pub fn deregister(&self, target_table: &ObjectName) {
        self.views.remove(&target_table.to_string());
    }

    /// Rewrite `query` against the first registered view that can answer it,
    /// or return it unchanged.
    pub fn rewrite(
        &self,
        metadata: &dyn MetadataSource,
        session: &Session,
        query: &Query,
    ) -> Query {
        for entry in self.views.iter() {
            let RegisteredView {
                target_table,
                view,
                config,
            } = entry.value();
            if !config.use_in_query_rewrite {
                continue;
            }
            let rewriter =
                QueryRewriter::new(metadata, session, target_table.clone(), view.clone());
            if let Some(rewritten) = rewriter.try_rewrite(query) {
                return rewritten;
            }
        }
        query.clone()
    }
}

#[cfg(test)]
mod test {
    use sqlparser::ast::{Ident, ObjectNamePart, Statement};
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    use crate::metadata::{SchemaMetadata, SqlType};

    use super::*;

    fn parse(sql: &str) -> Query {
        match Parser::parse_sql(&GenericDialect {}, sql)
            .expect("sql parses")
            .into_iter()
            .next()
        {
            Some(Statement::Query(query)) => *query,
            other => panic!("not a query: {other:?}"),
        }
    }

    fn metadata() -> SchemaMetadata {
        SchemaMetadata::new()
            .with_table(
                "t1",
                [
                    ("a", SqlType::BigInt),
                    ("b", SqlType::BigInt),
                    ("c", SqlType::BigInt),
                    ("d", SqlType::BigInt),
                    ("e", SqlType::BigInt),
                ],
            )
            .with_table("t6", [("a", SqlType::BigInt), ("b", SqlType::Varchar)])
    }

    fn target() -> ObjectName {
        ObjectName(vec![ObjectNamePart::Identifier(Ident::new("view"))])
    }

    struct TestCase {
        name: &'static str,
        view: &'static str,
        query: &'static str,
        expected: &'static str,
    }

    fn run_case(case: &TestCase) {
        let _ = env_logger::builder().is_test(true).try_init();
        let metadata = metadata();
        let session = Session::new();
        let rewriter = QueryRewriter::from_view_query(
            &metadata,
            &session,
            target(),
            &parse(case.view),
        )
        .unwrap_or_else(|e| panic!("{}: view extraction failed: {e}", case.name));
        let rewritten = rewriter.rewrite(&parse(case.query));
        assert_eq!(
            rewritten.to_string(),
            parse(case.expected).to_string(),
            "{}",
            case.name
        );
    }

    #[test]
    fn test_rewrite_scenarios() {
        let cases = vec![
            TestCase {
                name: "identity projection",
                view: "SELECT a, b FROM t1",
                query: "SELECT a, b FROM t1",
                expected: "SELECT a, b FROM view",
            },
            TestCase {
                name: "aliases on both sides",
                view: "SELECT a AS mv_a, b, c AS mv_c, d FROM t1",
                query: "SELECT a AS result_a, b AS result_b, c, d FROM t1",
                expected: "SELECT mv_a AS result_a, b AS result_b, mv_c, d FROM view",
            },
            TestCase {
                name: "derived projections re-aggregate",
                view: "SELECT SUM(a * b + c) AS mv_sum, MAX(a * b + c) AS mv_max, d, e FROM t1 GROUP BY d, e",
                query: "SELECT SUM(a * b + c), MAX(a * b + c), d, e FROM t1 GROUP BY d, e",
                expected: "SELECT SUM(mv_sum), MAX(mv_max), d, e FROM view GROUP BY d, e",
            },
            TestCase {
                name: "filter transposes when view has no filter",
                view: "SELECT a, b, c, d FROM t1",
                query: "SELECT a, b FROM t1 WHERE a < 10 AND c > 10 OR d = 20",
                expected: "SELECT a, b FROM view WHERE a < 10 AND c > 10 OR d = 20",
            },
            TestCase {
                name: "point filter inside range filter",
                view: "SELECT a, b, c FROM t1 WHERE a >= 5",
                query: "SELECT a, b, c FROM t1 WHERE a = 5",
                expected: "SELECT a, b, c FROM view WHERE a = 5",
            },
            TestCase {
                name: "intersected IN lists inside IN list",
                view: "SELECT a, b, c FROM t1 WHERE a IN (4, 5)",
                query: "SELECT a, b, c FROM t1 WHERE a IN (3, 5) AND a IN (5, 6)",
                expected: "SELECT a, b, c FROM view WHERE a IN (3, 5) AND a IN (5, 6)",
            },
            TestCase {
                name: "limit on the query passes through",
                view: "SELECT a, b, c FROM t1",
                query: "SELECT a, b FROM t1 ORDER BY c LIMIT 5",
                expected: "SELECT a, b FROM view ORDER BY c LIMIT 5",
            },
        ];
        for case in cases {
            run_case(&case);
        }
    }

    #[test]
    fn test_fallback_scenarios() {
        // Each of these must come back structurally unchanged.
        let cases = vec![
            TestCase {
                name: "column absent from the view",
                view: "SELECT a, b, c FROM t1",
                query: "SELECT c, d FROM t1",
                expected: "SELECT c, d FROM t1",
            },
            TestCase {
                name: "disjoint filters",
                view: "SELECT a, b, c FROM t1 WHERE a = 5",
                query: "SELECT a, b, c FROM t1 WHERE a = 4",
                expected: "SELECT a, b, c FROM t1 WHERE a = 4",
            },
            TestCase {
                name: "join in the query",
                view: "SELECT a, b, c FROM t1",
                query: "SELECT t1.a, t2.b FROM t1 JOIN t2 ON t1.c = t2.c",
                expected: "SELECT t1.a, t2.b FROM t1 JOIN t2 ON t1.c = t2.c",
            },
            TestCase {
                name: "distinct view, non-distinct query",
                view: "SELECT DISTINCT a, b FROM t1",
                query: "SELECT a, b FROM t1",
                expected: "SELECT a, b FROM t1",
            },
            TestCase {
                name: "different base table",
                view: "SELECT a, b FROM t6",
                query: "SELECT a, b FROM t1",
                expected: "SELECT a, b FROM t1",
            },
            TestCase {
                name: "aggregating view, non-aggregating query",
                view: "SELECT SUM(a) AS sum_a, b FROM t1 GROUP BY b",
                query: "SELECT b FROM t1",
                expected: "SELECT b FROM t1",
            },
            TestCase {
                name: "table alias in the query",
                view: "SELECT a, b, c FROM t1",
                query: "SELECT a, c FROM t1 base1",
                expected: "SELECT a, c FROM t1 base1",
            },
        ];
        for case in cases {
            run_case(&case);
        }
    }

    #[test]
    fn test_view_with_limit_cannot_register() {
        let err = ViewInfo::from_query(&parse("SELECT a, b, c FROM t1 LIMIT 5")).unwrap_err();
        assert_eq!(err.kind, crate::error::SemanticErrorKind::NotSupported);
    }

    #[test]
    fn test_registry_rewrites_against_registered_views() {
        let metadata = metadata();
        let session = Session::new();
        let registry = ViewRegistry::new();
        registry
            .register(target(), &parse("SELECT a, b FROM t1 WHERE a > 0"))
            .unwrap();

        let rewritten = registry.rewrite(&metadata, &session, &parse("SELECT a FROM t1 WHERE a > 5"));
        assert_eq!(
            rewritten.to_string(),
            "SELECT a FROM view WHERE a > 5"
        );

        // Unanswerable queries fall through unchanged.
        let unchanged = registry.rewrite(&metadata, &session, &parse("SELECT c FROM t1"));
        assert_eq!(unchanged.to_string(), "SELECT c FROM t1");

        // Deregistered views stop participating.
        registry.deregister(&target());
        let unchanged = registry.rewrite(&metadata, &session, &parse("SELECT a FROM t1 WHERE a > 5"));
        assert_eq!(unchanged.to_string(), "SELECT a FROM t1 WHERE a > 5");
    }

    #[test]
    fn test_registry_respects_config() {
        let metadata = metadata();
        let session = Session::new();
        let registry = ViewRegistry::new();
        registry
            .register_with_config(
                target(),
                &parse("SELECT a, b FROM t1"),
                MaterializedConfig {
                    use_in_query_rewrite: false,
                },
            )
            .unwrap();
        let unchanged = registry.rewrite(&metadata, &session, &parse("SELECT a FROM t1"));
        assert_eq!(unchanged.to_string(), "SELECT a FROM t1");

        let err = registry
            .register(target(), &parse("SELECT * FROM t1"))
            .unwrap_err();
        assert_eq!(err.kind, crate::error::SemanticErrorKind::NotSupported);
    }
}
