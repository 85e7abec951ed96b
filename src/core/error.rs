// Copyright 2025 Sqlweave Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for Sqlweave
//!
//! This module defines all error types used by template evaluation,
//! statement compilation, type resolution and result mapping.

use thiserror::Error;

/// Result type alias for Sqlweave operations
pub type Result<T> = std::result::Result<T, Error>;

/// Valid attribute names inside a `#{...}` parameter placeholder
pub const PARAMETER_PROPERTIES: &str =
    "javaType,jdbcType,mode,numericScale,resultMap,typeHandler,jdbcTypeName";

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad expression or rejected interpolation
    TemplateEvaluation,
    /// Malformed placeholder grammar or unsupported attributes
    Compilation,
    /// Missing converter, constructor or type
    TypeResolution,
    /// Missing or conflicting mapping references
    MappingResolution,
    /// Misuse detected while processing rows
    RowProcessing,
    /// Statement execution and session state
    Execution,
}

/// Main error type for Sqlweave
///
/// Every variant belongs to exactly one [`ErrorKind`]. Errors are raised
/// immediately and abort the current template evaluation or row pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Template evaluation errors
    // =========================================================================
    /// Expression text could not be parsed
    #[error("error parsing expression '{expression}': {message}")]
    ExpressionParse { expression: String, message: String },

    /// Expression failed while being evaluated
    #[error("error evaluating expression '{expression}': {message}")]
    ExpressionEvaluation { expression: String, message: String },

    /// Expression result could not be iterated
    #[error("error evaluating expression '{expression}': return value ({value}) was not iterable")]
    NotIterable { expression: String, value: String },

    /// Interpolated text did not match its validation pattern
    #[error("parameter '{value}' does not match validation pattern '{pattern}'")]
    InjectionRejected { value: String, pattern: String },

    // =========================================================================
    // Compilation errors
    // =========================================================================
    /// Placeholder payload does not follow the parameter grammar
    #[error("parsing error in {{{content}}} in position {position}")]
    ParameterParse { content: String, position: usize },

    /// Placeholder declares an attribute that does not exist
    #[error("an invalid property '{name}' was found in mapping #{{{content}}}. Valid properties are {}", PARAMETER_PROPERTIES)]
    UnknownParameterProperty { name: String, content: String },

    /// Placeholder attribute has a value that cannot be used
    #[error("invalid value '{value}' for '{name}' in mapping #{{{content}}}")]
    InvalidParameterProperty {
        name: String,
        value: String,
        content: String,
    },

    /// Expression-based placeholders are rejected
    #[error("expression based parameters are not supported: #{{{0}}}")]
    ExpressionParameterUnsupported(String),

    // =========================================================================
    // Type resolution errors
    // =========================================================================
    /// No converter registered for a logical type
    #[error("no type handler found for {value_type} (jdbc type {jdbc_type}) on '{property}'")]
    NoTypeHandler {
        value_type: String,
        jdbc_type: String,
        property: String,
    },

    /// Named converter does not exist
    #[error("type handler '{0}' not registered")]
    UnknownTypeHandler(String),

    /// Type name does not resolve to a known type
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// Value cannot be converted to the requested type
    #[error("cannot convert {from} to {to}")]
    TypeConversion { from: String, to: String },

    /// More than one constructor fits the row
    #[error("ambiguous constructors in {type_name} matching [{columns}]")]
    AmbiguousConstructor { type_name: String, columns: String },

    /// No constructor fits the row
    #[error("no constructor found in {type_name} matching [{columns}]")]
    NoConstructor { type_name: String, columns: String },

    /// Target type cannot be instantiated from the mapping
    #[error("do not know how to create an instance of {0}")]
    CannotInstantiate(String),

    /// Property does not exist on a type
    #[error("there is no property named '{property}' in '{type_name}'")]
    NoSuchProperty { type_name: String, property: String },

    /// Two accessors declared for the same property
    #[error("illegal overloaded accessor for property '{property}' in '{type_name}'")]
    AmbiguousAccessor { type_name: String, property: String },

    // =========================================================================
    // Mapping resolution errors
    // =========================================================================
    /// Result map id not registered
    #[error("result map '{0}' not found")]
    ResultMapNotFound(String),

    /// Statement id not registered
    #[error("mapped statement '{0}' not found")]
    StatementNotFound(String),

    /// Id registered twice
    #[error("'{0}' already registered")]
    DuplicateId(String),

    /// Two field mappings claim the same secondary result set
    #[error("two different properties are mapped to the same result set '{0}'")]
    DuplicateResultSetBinding(String),

    /// Field mapping definition is inconsistent
    #[error("invalid mapping for property '{property}': {message}")]
    InvalidMapping { property: String, message: String },

    /// Parent and child key columns of a multi-result-set join differ in length
    #[error("key column mismatch for property '{property}': {columns} columns vs {foreign_columns} foreign columns")]
    KeyColumnMismatch {
        property: String,
        columns: usize,
        foreign_columns: usize,
    },

    /// Automatic mapping met a column it cannot place
    #[error("unknown column '{column}' (property '{property}') in result map '{result_map}'")]
    UnknownColumn {
        result_map: String,
        column: String,
        property: String,
    },

    // =========================================================================
    // Row processing errors
    // =========================================================================
    /// Row window used on a statement whose objects span rows
    #[error("statement '{0}' has nested result mappings and cannot be safely constrained by row bounds")]
    RowBoundsNotAllowed(String),

    /// Custom result handler used on unordered nested results
    #[error("statement '{0}' has nested result mappings and cannot be safely used with a custom result handler unless its rows are ordered")]
    ResultHandlerNotAllowed(String),

    /// Statement declares no result maps
    #[error("statement '{0}' declares no result map or result type")]
    NoResultMaps(String),

    /// Single-row lookup returned several rows
    #[error("expected one result (or null) to be returned, but found: {0}")]
    TooManyResults(usize),

    /// Column missing from the cursor
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Column index outside the cursor's projection
    #[error("column index {index} out of bounds for {count} columns")]
    ColumnIndexOutOfBounds { index: usize, count: usize },

    /// Cursor read before `next()` or after exhaustion
    #[error("cursor is not positioned on a row")]
    NoCurrentRow,

    /// Failure while mapping a specific row
    #[error("error mapping row {row} of statement '{statement}': {source}")]
    Row {
        statement: String,
        row: usize,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Execution errors
    // =========================================================================
    /// Session used after close
    #[error("executor was closed")]
    ExecutorClosed,

    /// Backend reported a failure
    #[error("backend error: {0}")]
    Backend(String),

    /// Setting name or value not recognized
    #[error("invalid setting '{name}': {message}")]
    InvalidSetting { name: String, message: String },

    /// Internal error (should not happen)
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new ExpressionParse error
    pub fn expression_parse(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ExpressionParse {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Create a new ExpressionEvaluation error
    pub fn expression_evaluation(
        expression: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::ExpressionEvaluation {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Create a new ParameterParse error
    pub fn parameter_parse(content: impl Into<String>, position: usize) -> Self {
        Error::ParameterParse {
            content: content.into(),
            position,
        }
    }

    /// Create a new UnknownParameterProperty error
    pub fn unknown_parameter_property(name: impl Into<String>, content: impl Into<String>) -> Self {
        Error::UnknownParameterProperty {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a new InvalidParameterProperty error
    pub fn invalid_parameter_property(
        name: impl Into<String>,
        value: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Error::InvalidParameterProperty {
            name: name.into(),
            value: value.into(),
            content: content.into(),
        }
    }

    /// Create a new NoTypeHandler error
    pub fn no_type_handler(
        value_type: impl Into<String>,
        jdbc_type: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Error::NoTypeHandler {
            value_type: value_type.into(),
            jdbc_type: jdbc_type.into(),
            property: property.into(),
        }
    }

    /// Create a new TypeConversion error
    pub fn type_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Error::TypeConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a new NoSuchProperty error
    pub fn no_such_property(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Error::NoSuchProperty {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    /// Create a new InvalidMapping error
    pub fn invalid_mapping(property: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidMapping {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Create a new UnknownColumn error
    pub fn unknown_column(
        result_map: impl Into<String>,
        column: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Error::UnknownColumn {
            result_map: result_map.into(),
            column: column.into(),
            property: property.into(),
        }
    }

    /// Create a new InvalidSetting error
    pub fn invalid_setting(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidSetting {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a new Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into())
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Attach statement id and row ordinal to a row-level failure
    ///
    /// Errors that already carry row context are returned unchanged so
    /// that nested statements keep the innermost location.
    pub fn at_row(self, statement: impl Into<String>, row: usize) -> Self {
        match self {
            err @ Error::Row { .. } => err,
            err => Error::Row {
                statement: statement.into(),
                row,
                source: Box::new(err),
            },
        }
    }

    /// Returns the error with any row context removed
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Row { source, .. } => source.root_cause(),
            err => err,
        }
    }

    /// Returns the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ExpressionParse { .. }
            | Error::ExpressionEvaluation { .. }
            | Error::NotIterable { .. }
            | Error::InjectionRejected { .. } => ErrorKind::TemplateEvaluation,

            Error::ParameterParse { .. }
            | Error::UnknownParameterProperty { .. }
            | Error::InvalidParameterProperty { .. }
            | Error::ExpressionParameterUnsupported(_) => ErrorKind::Compilation,

            Error::NoTypeHandler { .. }
            | Error::UnknownTypeHandler(_)
            | Error::UnknownType(_)
            | Error::TypeConversion { .. }
            | Error::AmbiguousConstructor { .. }
            | Error::NoConstructor { .. }
            | Error::CannotInstantiate(_)
            | Error::NoSuchProperty { .. }
            | Error::AmbiguousAccessor { .. } => ErrorKind::TypeResolution,

            Error::ResultMapNotFound(_)
            | Error::StatementNotFound(_)
            | Error::DuplicateId(_)
            | Error::DuplicateResultSetBinding(_)
            | Error::InvalidMapping { .. }
            | Error::KeyColumnMismatch { .. }
            | Error::UnknownColumn { .. } => ErrorKind::MappingResolution,

            Error::RowBoundsNotAllowed(_)
            | Error::ResultHandlerNotAllowed(_)
            | Error::NoResultMaps(_)
            | Error::TooManyResults(_)
            | Error::ColumnNotFound(_)
            | Error::ColumnIndexOutOfBounds { .. }
            | Error::NoCurrentRow => ErrorKind::RowProcessing,

            Error::Row { source, .. } => source.kind(),

            Error::ExecutorClosed
            | Error::Backend(_)
            | Error::InvalidSetting { .. }
            | Error::Internal { .. } => ErrorKind::Execution,
        }
    }

    /// Returns true if this is a template evaluation error
    pub fn is_template_error(&self) -> bool {
        self.kind() == ErrorKind::TemplateEvaluation
    }

    /// Returns true if a referenced id could not be found
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::ResultMapNotFound(_) | Error::StatementNotFound(_) | Error::ColumnNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::ResultMapNotFound("blog.authorMap".to_string()).to_string(),
            "result map 'blog.authorMap' not found"
        );
        assert_eq!(
            Error::ColumnNotFound("email".to_string()).to_string(),
            "column 'email' not found"
        );
        assert_eq!(Error::ExecutorClosed.to_string(), "executor was closed");
        assert_eq!(
            Error::parameter_parse("id,", 3).to_string(),
            "parsing error in {id,} in position 3"
        );
    }

    #[test]
    fn test_unknown_property_lists_valid_names() {
        let err = Error::unknown_parameter_property("colour", "id,colour=red");
        assert_eq!(
            err.to_string(),
            "an invalid property 'colour' was found in mapping #{id,colour=red}. \
             Valid properties are javaType,jdbcType,mode,numericScale,resultMap,typeHandler,jdbcTypeName"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::expression_parse("a ==", "unexpected end").kind(),
            ErrorKind::TemplateEvaluation
        );
        assert_eq!(
            Error::ExpressionParameterUnsupported("(1+1)".into()).kind(),
            ErrorKind::Compilation
        );
        assert_eq!(
            Error::type_conversion("TEXT", "INTEGER").kind(),
            ErrorKind::TypeResolution
        );
        assert_eq!(
            Error::DuplicateResultSetBinding("authors".into()).kind(),
            ErrorKind::MappingResolution
        );
        assert_eq!(
            Error::RowBoundsNotAllowed("s".into()).kind(),
            ErrorKind::RowProcessing
        );
    }

    #[test]
    fn test_row_context() {
        let err = Error::type_conversion("TEXT", "INTEGER").at_row("blog.select", 4);
        assert_eq!(
            err.to_string(),
            "error mapping row 4 of statement 'blog.select': cannot convert TEXT to INTEGER"
        );
        assert_eq!(err.kind(), ErrorKind::TypeResolution);

        // Already wrapped errors keep the innermost location
        let again = err.clone().at_row("outer", 1);
        assert_eq!(again, err);
        assert_eq!(
            again.root_cause(),
            &Error::type_conversion("TEXT", "INTEGER")
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::StatementNotFound("x".into()).is_not_found());
        assert!(Error::ColumnNotFound("c".into()).at_row("s", 0).is_not_found());
        assert!(!Error::ExecutorClosed.is_not_found());
    }
}
