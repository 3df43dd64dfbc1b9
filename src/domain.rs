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

//! The predicate domain model.
//!
//! WHERE clauses are reasoned about symbolically as [`TupleDomain`]s: for
//! each column, the set of values a row may take, where the per-column sets
//! are finite unions of intervals over a typed, totally ordered value space.
//! The [`translator`] converts between predicate expressions and this form;
//! the [`value_set`] algebra underneath is generic over the value space and
//! usable on its own.

/// Conversion between predicate expressions and tuple domains.
pub mod translator;

/// Typed per-column domains and their conjunctive combination.
pub mod tuple_domain;

/// A generic set algebra over totally ordered value spaces.
pub mod value_set;

pub use translator::DomainTranslator;
pub use tuple_domain::{Domain, DomainError, ScalarType, ScalarValue, TupleDomain};
pub use value_set::{ValueRange, ValueSet};
