//! # Error Types
//!
//! Domain-specific error types for gestion-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  gestion-core errors (this file)                                       │
//! │  ├── CoreError        - Order workflow / policy failures               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  gestion-db errors (separate crate)                                    │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller (HTTP layer)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure that leaves the order workflow is one of the variants below
//! and is reported with no partial state change.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the order workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A referenced order, line, product or counterparty does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation is not permitted in the order's current status.
    ///
    /// ## When This Occurs
    /// - Adding or removing a line on a finalized/cancelled order
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidState {
        entity: String,
        id: String,
        status: String,
        operation: String,
    },

    /// Sale finalize pre-check failed for at least one line.
    ///
    /// ## User Workflow
    /// ```text
    /// Finalize PED-00007
    ///      │
    ///      ▼
    /// Line: 4 × "Cafe 500g", stock = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Cafe 500g", requested: 4, available: 3 }
    ///      │
    ///      ▼
    /// Order stays Pending, nothing is decremented
    /// ```
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    /// A purchase line references a product the order's supplier does not supply.
    #[error("Product {product} is not supplied by supplier {supplier}")]
    InvalidProduct { product: String, supplier: String },

    /// The capability check denied the actor.
    #[error("{actor} is not permitted to {action}")]
    Forbidden { actor: String, action: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate product code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product: "CAF-500".to_string(),
            requested: 4,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for CAF-500: requested 4, available 3"
        );
    }

    #[test]
    fn test_invalid_state_message() {
        let err = CoreError::InvalidState {
            entity: "Sale".to_string(),
            id: "PED-00001".to_string(),
            status: "completed".to_string(),
            operation: "add lines".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sale PED-00001 is completed, cannot add lines"
        );
    }

    #[test]
    fn test_not_found_helper() {
        let err = CoreError::not_found("Product", 42);
        assert_eq!(err.to_string(), "Product not found: 42");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
