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

//! Metadata interfaces consumed during rewriting.
//!
//! The rewriter itself never inspects a catalog; it asks a [`MetadataSource`]
//! for column types when translating predicates into the domain model, and
//! threads an opaque [`Session`] through every lookup.

use std::collections::HashMap;

use sqlparser::ast::ObjectName;

/// SQL scalar types known to the metadata oracle.
///
/// Only types with a domain-model representation are listed; anything else a
/// catalog may contain is simply reported as unknown by the oracle, which
/// makes the predicate untranslatable and the affected query ineligible for
/// rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// 64-bit signed integer.
    BigInt,
    /// Double-precision floating point. Decimal columns are reported as this.
    Double,
    /// Variable-length character data.
    Varchar,
    /// Calendar date. Compared through its ISO-8601 text form, which orders
    /// the same way the date does.
    Date,
}

/// Opaque session context, passed through to metadata lookups.
///
/// The rewriter attaches no meaning to it; a [`MetadataSource`] may use it for
/// access control or per-session catalog resolution.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<String>,
}

impl Session {
    /// An anonymous session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a user identity to the session.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// The user this session runs as, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

/// Type oracle for resolving column types during domain translation.
pub trait MetadataSource: Send + Sync {
    /// Resolve the declared type of `column` in `table`.
    ///
    /// Returns `None` when the column (or the table) is unknown; the caller
    /// treats this as an untranslatable predicate rather than an error.
    fn column_type(&self, session: &Session, table: &ObjectName, column: &str) -> Option<SqlType>;
}

/// An in-memory [`MetadataSource`] backed by a fixed table layout.
///
/// ```
/// use sql_materialized_views::metadata::{SchemaMetadata, SqlType};
///
/// let metadata = SchemaMetadata::new()
///     .with_table("orders", [("orderkey", SqlType::BigInt), ("comment", SqlType::Varchar)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaMetadata {
    tables: HashMap<String, HashMap<String, SqlType>>,
}

impl SchemaMetadata {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with the given column types. The table name is matched
    /// against the rendering of the query's table reference.
    pub fn with_table<'a>(
        mut self,
        name: &str,
        columns: impl IntoIterator<Item = (&'a str, SqlType)>,
    ) -> Self {
        self.tables.insert(
            name.to_string(),
            columns
                .into_iter()
                .map(|(column, sql_type)| (column.to_string(), sql_type))
                .collect(),
        );
        self
    }
}

impl MetadataSource for SchemaMetadata {
    fn column_type(&self, _session: &Session, table: &ObjectName, column: &str) -> Option<SqlType> {
        self.tables
            .get(&table.to_string())
            .and_then(|columns| columns.get(column))
            .copied()
    }
}
