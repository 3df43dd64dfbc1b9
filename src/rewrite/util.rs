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

use sqlparser::ast::{BinaryOperator, Expr, ObjectName, Query, Select, SetExpr, TableFactor};

/// Split `expr` into its top-level OR terms, looking through parentheses.
pub fn split_disjunction(expr: &Expr) -> Vec<&Expr> {
    let mut out = vec![];
    collect_terms(expr, &BinaryOperator::Or, &mut out);
    out
}

fn collect_terms<'a>(expr: &'a Expr, connective: &BinaryOperator, out: &mut Vec<&'a Expr>) {
    match expr {
        Expr::BinaryOp { left, op, right } if op == connective => {
            collect_terms(left, connective, out);
            collect_terms(right, connective, out);
        }
        Expr::Nested(inner) => collect_terms(inner, connective, out),
        _ => out.push(expr),
    }
}

/// The body of `query` when it is a plain, CTE-free SELECT.
pub fn single_select(query: &Query) -> Option<&Select> {
    if query.with.is_some() {
        return None;
    }
    match query.body.as_ref() {
        SetExpr::Select(select) => Some(select.as_ref()),
        _ => None,
    }
}

/// The name of `relation` when it is a bare table reference: no alias, no
/// table-function arguments.
pub fn bare_table_name(relation: &TableFactor) -> Option<&ObjectName> {
    match relation {
        TableFactor::Table {
            name,
            alias: None,
            args: None,
            ..
        } => Some(name),
        _ => None,
    }
}
