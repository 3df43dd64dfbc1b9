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

//! Rewriting expressions from base-table terms into view terms.

use sqlparser::ast::{
    Expr, Function, FunctionArg, FunctionArgExpr, FunctionArgumentList, FunctionArguments,
};

use super::view_info::ViewInfo;

/// Rewrites expressions written against a view's base table so that they read
/// from the view's output columns instead.
///
/// Substitution is structural and whole-expression-first: an expression that
/// matches one of the view's projections in its entirety becomes a reference
/// to the projected column, so a derived projection like
/// `SUM(a * b + c) AS mv_sum` is reused as-is when the query repeats the same
/// expression. Only when no whole match exists does the rewriter descend into
/// children. Every method answers `None` when some referenced expression is
/// not expressible from the view, which aborts the enclosing rewrite.
pub struct ExpressionRewriter<'a> {
    view: &'a ViewInfo,
}

impl<'a> ExpressionRewriter<'a> {
    /// A rewriter substituting per `view`'s projections.
    pub fn new(view: &'a ViewInfo) -> Self {
        Self { view }
    }

    /// Rewrite `expr` into view terms, or `None` when it cannot be expressed
    /// from the view.
    pub fn rewrite(&self, expr: &Expr) -> Option<Expr> {
        // Function calls keep their call shape: a whole-call match replaces
        // the argument list with the projected column, not the call itself,
        // so an aggregate over the view re-aggregates the view's column.
        if let Expr::Function(function) = expr {
            return self.rewrite_function(function).map(Expr::Function);
        }
        if let Some(name) = self.view.view_column(expr) {
            return Some(Expr::Identifier(name.clone()));
        }
        match expr {
            Expr::Identifier(ident) => {
                // Not a projected base column; the query may legitimately
                // name a view output column directly.
                self.view.exposes_column(ident).then(|| expr.clone())
            }
            Expr::Value(_) => Some(expr.clone()),
            Expr::BinaryOp { left, op, right } => Some(Expr::BinaryOp {
                left: Box::new(self.rewrite(left)?),
                op: op.clone(),
                right: Box::new(self.rewrite(right)?),
            }),
            Expr::UnaryOp { op, expr: inner } => Some(Expr::UnaryOp {
                op: op.clone(),
                expr: Box::new(self.rewrite(inner)?),
            }),
            Expr::Nested(inner) => Some(Expr::Nested(Box::new(self.rewrite(inner)?))),
            Expr::InList {
                expr: needle,
                list,
                negated,
            } => Some(Expr::InList {
                expr: Box::new(self.rewrite(needle)?),
                list: list
                    .iter()
                    .map(|item| self.rewrite(item))
                    .collect::<Option<Vec<_>>>()?,
                negated: *negated,
            }),
            Expr::Between {
                expr: needle,
                negated,
                low,
                high,
            } => Some(Expr::Between {
                expr: Box::new(self.rewrite(needle)?),
                negated: *negated,
                low: Box::new(self.rewrite(low)?),
                high: Box::new(self.rewrite(high)?),
            }),
            _ => None,
        }
    }

    /// Rewrite a grouping key. Grouping keys are held to a stricter rule than
    /// general expressions: the key must be one of the view's projections or
    /// already name a view output column; composite keys are not recombined
    /// from parts.
    pub fn rewrite_grouping_key(&self, expr: &Expr) -> Option<Expr> {
        if let Some(name) = self.view.view_column(expr) {
            return Some(Expr::Identifier(name.clone()));
        }
        if let Expr::Identifier(ident) = expr {
            if self.view.exposes_column(ident) {
                return Some(expr.clone());
            }
        }
        None
    }

    fn rewrite_function(&self, function: &Function) -> Option<Function> {
        if !matches!(function.parameters, FunctionArguments::None) {
            return None;
        }
        if function.over.is_some() || function.filter.is_some() || !function.within_group.is_empty()
        {
            return None;
        }
        if let Some(name) = self.view.view_column(&Expr::Function(function.clone())) {
            let mut rewritten = function.clone();
            rewritten.args = FunctionArguments::List(FunctionArgumentList {
                duplicate_treatment: None,
                args: vec![FunctionArg::Unnamed(FunctionArgExpr::Expr(
                    Expr::Identifier(name.clone()),
                ))],
                clauses: vec![],
            });
            return Some(rewritten);
        }
        let mut rewritten = function.clone();
        match &mut rewritten.args {
            FunctionArguments::List(list) => {
                for arg in &mut list.args {
                    match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => {
                            *expr = self.rewrite(expr)?;
                        }
                        _ => return None,
                    }
                }
            }
            FunctionArguments::None => {}
            FunctionArguments::Subquery(_) => return None,
        }
        Some(rewritten)
    }
}
