//! # Bank Transfer Requests
//!
//! Builds the payload handed to an external QR generator when a customer
//! pays by bank transfer. Rendering the QR image is not done here.
//!
//! ```text
//! PaymentSettings ─┐
//! invoice total  ──┼──► TransferRequest { bank_code: "vcb",
//! amount paid    ──┤                      account: "0123456789",
//! invoice date   ──┘                      holder, amount: 186000,
//!                                         description: "INV261019" }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use tillpoint_core::Money;

use crate::error::{ErrorCode, RegisterError, RegisterResult};
use crate::settings::PaymentSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRequest {
    /// Bank code, lowercase.
    pub bank_code: String,

    /// Account number without spaces.
    pub account: String,

    pub holder: String,

    /// Whole currency units still owed.
    pub amount: i64,

    /// `INV` followed by the invoice date as `yyMMdd`.
    pub description: String,
}

impl TransferRequest {
    /// Requests the outstanding `total - paid`, never negative.
    ///
    /// ## Errors
    /// `PaymentError` when transfers are disabled or bank details are
    /// incomplete.
    pub fn new(
        settings: &PaymentSettings,
        total: Money,
        paid: Money,
        invoice_date: DateTime<Utc>,
    ) -> RegisterResult<Self> {
        if !settings.enable_transfer {
            return Err(RegisterError::new(
                ErrorCode::PaymentError,
                "Bank transfer payments are disabled",
            ));
        }
        if !settings.is_configured() {
            return Err(RegisterError::new(
                ErrorCode::PaymentError,
                "Bank details are not configured",
            ));
        }

        Ok(TransferRequest {
            bank_code: settings.bank_code.trim().to_lowercase(),
            account: settings.bank_account.chars().filter(|c| !c.is_whitespace()).collect(),
            holder: settings.account_holder.trim().to_string(),
            amount: (total - paid).clamp_non_negative().round_to_major(),
            description: format!("INV{}", invoice_date.format("%y%m%d")),
        })
    }
}
