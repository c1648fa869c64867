//! Email field splitting
//!
//! Splits on the single `@` without trimming or case folding.

use crate::domain::{EmailError, EmailParts};

/// Split an email field into customer and domain.
///
/// Exactly one `@` must be present and both sides must be non-empty.
pub fn split_email(email: &str) -> Result<EmailParts<'_>, EmailError> {
    let (customer, domain) = email.split_once('@').ok_or(EmailError::Malformed)?;

    if domain.contains('@') {
        return Err(EmailError::Malformed);
    }

    if customer.is_empty() {
        return Err(EmailError::MissingCustomer);
    }

    if domain.is_empty() {
        return Err(EmailError::MissingDomain);
    }

    Ok(EmailParts { customer, domain })
}
