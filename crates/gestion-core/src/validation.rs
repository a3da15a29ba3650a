//! # Validation Module
//!
//! Input validation for catalog records and order lines.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP form / API payload)                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use gestion_core::validation::{validate_code, validate_quantity};
//!
//! assert!(validate_code("CAF-500").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::types::{NewClient, NewProduct, NewSupplier};
use crate::{MAX_LINE_QUANTITY, MAX_PRICE_CENTS, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - No whitespace
///
/// ## Example
/// ```rust
/// use gestion_core::validation::validate_code;
///
/// assert!(validate_code("CAF-500").is_ok());
/// assert!(validate_code("").is_err());
/// assert!(validate_code("has space").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if code.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates a required free-text field with a maximum length.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Phone numbers are stored as at most 8 characters.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    validate_text("phone", phone, 8)
}

/// Minimal email shape check: one `@` with something on both sides.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_text("email", email, 254)?;

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain".to_string(),
        }),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or cost in cents. Zero is allowed.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Stock at rest is never negative.
pub fn validate_stock(quantity: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "stock_quantity".to_string(),
            min: 0,
            max: MAX_STOCK_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_code(&product.code)?;
    validate_text("name", &product.name, 100)?;
    validate_price_cents(product.sale_price_cents)?;
    validate_price_cents(product.purchase_cost_cents)?;
    validate_stock(product.stock_quantity)
}

pub fn validate_new_client(client: &NewClient) -> ValidationResult<()> {
    validate_text("name", &client.name, 150)?;
    validate_text("address", &client.address, 500)?;
    validate_phone(&client.phone)?;
    validate_email(&client.email)
}

pub fn validate_new_supplier(supplier: &NewSupplier) -> ValidationResult<()> {
    validate_text("company", &supplier.company, 100)?;
    validate_text("contact", &supplier.contact, 100)?;
    validate_phone(&supplier.phone)?;
    validate_text("address", &supplier.address, 500)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_code() {
        assert!(validate_code("CAF-500").is_ok());
        assert!(validate_code("abc_1").is_ok());

        assert!(validate_code("").is_err());
        assert!(validate_code("   ").is_err());
        assert!(validate_code("has space").is_err());
        assert!(validate_code(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-3).is_err());
    }

    #[test]
    fn test_price_and_stock_upper_bounds() {
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(validate_price_cents(MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_price_cents(i64::MAX / 2).is_err());

        assert!(validate_stock(MAX_STOCK_QUANTITY).is_ok());
        assert_eq!(
            validate_stock(i64::MAX - 1),
            Err(ValidationError::OutOfRange {
                field: "stock_quantity".to_string(),
                min: 0,
                max: MAX_STOCK_QUANTITY,
            })
        );
    }

    #[test]
    fn test_validate_phone_and_email() {
        assert!(validate_phone("22334455").is_ok());
        assert!(validate_phone("223344556").is_err());

        assert!(validate_email("ventas@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@b@c").is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let mut product = NewProduct {
            code: "CAF-500".to_string(),
            name: "Cafe 500g".to_string(),
            description: None,
            sale_price_cents: 1099,
            purchase_cost_cents: 700,
            stock_quantity: 0,
            supplier_id: None,
            category_id: None,
        };
        assert!(validate_new_product(&product).is_ok());

        product.stock_quantity = -1;
        assert!(validate_new_product(&product).is_err());
    }
}
