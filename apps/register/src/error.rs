//! # Register Error Type
//!
//! Unified error type for register operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Register                           │
//! │                                                                         │
//! │  Register::checkout()                                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Cart / pricing ─── CoreError::EmptyCart ────────┐               │  │
//! │  │         │                                        │               │  │
//! │  │         ▼                                        ▼               │  │
//! │  │  Store commit ─── DbError::TransactionFailed ── RegisterError ──►│  │
//! │  │         │                                  { code, message,      │  │
//! │  │         ▼                                    retryable }         │  │
//! │  │  Success ───────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers switch on the machine-readable `code` and show `message`.

use serde::Serialize;
use tillpoint_core::{CoreError, ValidationError};
use tillpoint_db::DbError;

use crate::config::ConfigError;

/// Error returned from register operations.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for product p-1: 2 available, 3 requested",
///   "retryable": false
/// }
/// ```
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code:?}] {message}")]
pub struct RegisterError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Whether the same request may succeed if tried again.
    pub retryable: bool,
}

/// Error codes for register operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Storage failed; the operation was rolled back
    Persistence,

    /// Cart operation failed
    CartError,

    /// Insufficient stock
    InsufficientStock,

    /// Voucher was used up while the invoice was being committed
    VoucherUnavailable,

    /// Payment processing error
    PaymentError,

    /// The current role may not perform the operation
    PermissionDenied,

    /// Settings or configuration could not be read or written
    Config,

    /// Internal error
    Internal,
}

impl RegisterError {
    /// Creates a new, non-retryable error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        RegisterError {
            code,
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        RegisterError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        RegisterError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a permission error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        RegisterError::new(ErrorCode::PermissionDenied, message)
    }

    /// Marks the error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Whether retrying may succeed (storage hiccups, pool timeouts).
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Converts database errors to register errors.
impl From<DbError> for RegisterError {
    fn from(err: DbError) -> Self {
        let transient = err.is_transient();
        let error = match err {
            DbError::NotFound { entity, id } => RegisterError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => RegisterError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                RegisterError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::InsufficientStock {
                product_id,
                available,
                requested,
            } => RegisterError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Insufficient stock for product {}: {} available, {} requested",
                    product_id, available, requested
                ),
            ),
            DbError::VoucherUnavailable { code } => RegisterError::new(
                ErrorCode::VoucherUnavailable,
                format!("Voucher {} can no longer be redeemed", code),
            ),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                RegisterError::new(ErrorCode::Persistence, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                RegisterError::new(ErrorCode::Persistence, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                RegisterError::new(ErrorCode::Persistence, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                RegisterError::new(ErrorCode::Persistence, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                RegisterError::new(ErrorCode::Persistence, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                RegisterError::new(ErrorCode::Persistence, "Database operation failed")
            }
        };

        RegisterError {
            retryable: transient,
            ..error
        }
    }
}

/// Converts core errors to register errors.
impl From<CoreError> for RegisterError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => RegisterError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Insufficient stock for product {}: {} available, {} requested",
                    product_id, available, requested
                ),
            ),
            CoreError::LineNotFound { product_id, unit_price } => RegisterError::new(
                ErrorCode::CartError,
                format!("Product {} at {} is not in the cart", product_id, unit_price),
            ),
            CoreError::CartTooLarge { max } => RegisterError::new(
                ErrorCode::CartError,
                format!("Cart cannot have more than {} lines", max),
            ),
            CoreError::EmptyCart => RegisterError::new(ErrorCode::CartError, "Cart is empty"),
            CoreError::AmountTooLarge { limit } => RegisterError::new(
                ErrorCode::CartError,
                format!("Invoice amount would exceed {}", limit),
            ),
            CoreError::Validation(e) => RegisterError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for RegisterError {
    fn from(err: ValidationError) -> Self {
        RegisterError::validation(err.to_string())
    }
}

impl From<ConfigError> for RegisterError {
    fn from(err: ConfigError) -> Self {
        RegisterError::new(ErrorCode::Config, err.to_string())
    }
}

/// Convenience type alias for register results.
pub type RegisterResult<T> = Result<T, RegisterError>;
