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

//! Semantic diagnostics for view definitions.
//!
//! Only the view side of a rewrite can fail hard: a view definition that uses
//! shapes the rewriter cannot see through is rejected at registration time
//! with a [`SemanticError`]. Base queries never fail — any query the rewriter
//! cannot handle is simply returned unchanged.

use std::fmt;

use thiserror::Error;

/// Classes of hard semantic failures raised while inspecting a view definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SemanticErrorKind {
    /// The construct is valid SQL but outside what view-backed rewriting supports.
    NotSupported,
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticErrorKind::NotSupported => write!(f, "NOT_SUPPORTED"),
        }
    }
}

/// A hard semantic failure tied to a specific AST node.
///
/// The offending node is carried as its SQL rendering so the error stays
/// self-contained after the AST it came from is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}: {node}")]
pub struct SemanticError {
    /// The failure class.
    pub kind: SemanticErrorKind,
    /// SQL rendering of the offending AST node.
    pub node: String,
    /// Human-readable explanation.
    pub message: String,
}

impl SemanticError {
    /// Flag `node` as unsupported for view-backed rewriting.
    pub fn not_supported(node: &dyn fmt::Display, message: impl Into<String>) -> Self {
        Self {
            kind: SemanticErrorKind::NotSupported,
            node: node.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_rendering() {
        let err = SemanticError::not_supported(&"SELECT * FROM t1", "all-columns select");
        assert_eq!(
            err.to_string(),
            "NOT_SUPPORTED: all-columns select: SELECT * FROM t1"
        );
        assert_eq!(err.kind, SemanticErrorKind::NotSupported);
    }
}
