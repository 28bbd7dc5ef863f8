//! Shared primitive types used across the whole analysis engine.

/// CRM offer identifier.
pub type OfferId = i64;

/// Affiliate ("web") identifier.
pub type AffiliateId = i64;

/// CRM lead identifier.
pub type LeadId = i64;

/// Telephony call identifier.
pub type CallId = i64;

/// Telephony operator identifier.
pub type OperatorId = i64;

/// Sentinel offer id meaning "this row could not be attributed to an offer".
/// Rows carrying it are still counted, but excluded from plan-driven
/// projections.
pub const UNATTRIBUTED_OFFER: OfferId = 0;
