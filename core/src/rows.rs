//! Typed input rows — the ingestion boundary.
//!
//! The external operational store hands the engine four row shapes (plus the
//! offer catalog). Required fields are plain values; anything the source may
//! legitimately omit is an `Option`. All timestamps arrive as ISO-8601
//! strings and stay strings — the engine only ever compares them
//! lexicographically or truncates them to a day.

use crate::types::{AffiliateId, CallId, LeadId, OfferId, OperatorId};
use serde::{Deserialize, Serialize};

/// One answered telephone call event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRow {
    pub id: CallId,
    /// Telephony dedup key; repeated rows with the same uniqueid are the
    /// same physical call observed twice.
    pub uniqueid: String,
    pub offer_id: OfferId,
    pub affiliate_id: AffiliateId,
    pub operator_id: OperatorId,
    pub operator_name: String,
    pub lead_id: LeadId,
    /// `YYYY-MM-DD ...`; only the day part participates in grouping.
    pub call_date: String,
    /// Primary talk duration, seconds. Required — a null here is a data
    /// error upstream.
    #[serde(default)]
    pub billsec: Option<i64>,
    /// Re-measured duration from the recording pipeline, when available.
    #[serde(default)]
    pub billsec_exact: Option<i64>,
    pub category_name: String,
}

/// One approval-stage lead record (the call-efficiency funnel view).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRow {
    pub lead_id: LeadId,
    #[serde(default)]
    pub approved_at: Option<String>,
    #[serde(default)]
    pub canceled_at: Option<String>,
    pub status_verbose: String,
    pub status_group: String,
    pub operator_name: String,
    pub offer_id: OfferId,
    pub affiliate_id: AffiliateId,
    pub category_name: String,
}

/// One lead viewed through its full lifecycle (the approve/buyout/trash
/// accounting view).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadContainerRow {
    pub lead_id: LeadId,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub approved_at: Option<String>,
    #[serde(default)]
    pub canceled_at: Option<String>,
    #[serde(default)]
    pub buyout_at: Option<String>,
    pub status_verbose: String,
    pub status_group: String,
    #[serde(default)]
    pub is_trash: bool,
    pub offer_id: OfferId,
    pub affiliate_id: AffiliateId,
    pub category_name: String,
}

/// One KPI plan record from the plan feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiPlanRow {
    pub id: i64,
    pub offer_id: OfferId,
    /// `None` means the plan applies to every affiliate on the offer.
    #[serde(default)]
    pub affiliate_id: Option<AffiliateId>,
    /// Strictly `YYYY-MM-DD`.
    pub period_date: String,
    #[serde(default)]
    pub operator_efficiency: Option<f64>,
    #[serde(default)]
    pub planned_approve: Option<f64>,
    #[serde(default)]
    pub planned_buyout: Option<f64>,
    #[serde(default)]
    pub confirmation_price: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub operator_efficiency_updated_at: Option<String>,
    #[serde(default)]
    pub planned_approve_updated_at: Option<String>,
    #[serde(default)]
    pub planned_buyout_updated_at: Option<String>,
    #[serde(default)]
    pub confirmation_price_updated_at: Option<String>,
}

/// Offer catalog entry. Pushing these up front lets offers with no traffic
/// in the period still appear in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRow {
    pub id: OfferId,
    pub name: String,
    pub category_name: String,
}
