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

#![deny(missing_docs)]

//! `sql-materialized-views` implements query rewriting against materialized
//! views, working directly on [`sqlparser`] ASTs.
//!
//! Given a view definition, a target table holding the view's materialized
//! contents, and an incoming query over the same base table, the
//! [`rewrite::QueryRewriter`] decides whether the query can be answered from
//! the target table and, if so, transposes its select list, filters,
//! group-bys, and order-bys through the view's projections. The decision
//! machinery — most notably the symbolic filter-containment proof — lives in
//! the [`domain`] module; the [`metadata`] module defines the thin oracle
//! interface the engine must supply.

/// The predicate domain model used by the filter containment test.
pub mod domain;

/// Semantic diagnostics for view definitions.
pub mod error;

/// Metadata interfaces consumed during rewriting.
pub mod metadata;

/// Query rewriting against materialized views.
pub mod rewrite;

/// Configuration options for materialized view related features.
#[derive(Debug, Clone)]
pub struct MaterializedConfig {
    /// Whether or not query rewriting should exploit this materialized view.
    pub use_in_query_rewrite: bool,
}

impl Default for MaterializedConfig {
    fn default() -> Self {
        Self {
            use_in_query_rewrite: true,
        }
    }
}
