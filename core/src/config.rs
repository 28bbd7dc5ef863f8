//! Analysis configuration.
//!
//! Every business threshold the engine applies lives here, with the
//! production defaults inline. Configs deserialize from JSON so a deployment
//! can override any subset of fields; everything else falls back to the
//! defaults below.

use crate::error::KpiResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Talk time (seconds) at which a call group counts as effective.
    #[serde(default = "default_effective_call_seconds")]
    pub effective_call_seconds: i64,

    /// Plans with operator efficiency below this are unusable for the
    /// expected-approved-leads projection.
    #[serde(default = "default_min_plan_efficiency")]
    pub min_plan_efficiency: f64,

    /// Minimum effective-call volume for an operator to be statistically
    /// meaningful to the recommendation engine.
    #[serde(default = "default_calls_count_for_analyze")]
    pub calls_count_for_analyze: u64,

    /// Share of qualified operators taken as the top-performer pool.
    #[serde(default = "default_top_operator_share")]
    pub top_operator_share: f64,

    /// Lower bound on the top-performer pool; below it no plan is computed.
    #[serde(default = "default_top_operator_min")]
    pub top_operator_min: usize,

    /// Upper bound on the top-performer pool.
    #[serde(default = "default_top_operator_max")]
    pub top_operator_max: usize,

    /// Absolute plan-vs-recommendation gap (calls per lead) that flags the
    /// efficiency dimension for correction.
    #[serde(default = "default_efficiency_tolerance")]
    pub efficiency_tolerance: f64,

    /// Plan-vs-recommendation gap, in percentage points, that flags the
    /// approve and buyout dimensions.
    #[serde(default = "default_percent_tolerance")]
    pub percent_tolerance: f64,

    /// Planned approve/buyout percentages below this count as "not set".
    #[serde(default = "default_min_percent_plan")]
    pub min_percent_plan: f64,

    /// Confirmation prices below this count as "not set".
    #[serde(default = "default_min_confirmation_price")]
    pub min_confirmation_price: f64,

    /// Damping factor blending the observed approve count toward the
    /// efficiency-implied one when recommending an approve target.
    #[serde(default = "default_approve_blend_factor")]
    pub approve_blend_factor: f64,

    /// The recommended approve percentage is clamped to
    /// [fact, fact + approve_clamp_width].
    #[serde(default = "default_approve_clamp_width")]
    pub approve_clamp_width: f64,

    /// Relative nudge applied to the observed buyout percentage when
    /// recommending a buyout target.
    #[serde(default = "default_buyout_nudge")]
    pub buyout_nudge: f64,

    /// When true, malformed input rows abort the run instead of being
    /// dropped with a warning.
    #[serde(default)]
    pub strict_rows: bool,

    /// Date offers' plans are compared against. Plans are checked against
    /// current targets, not the analysis period. `None` means today.
    #[serde(default)]
    pub plan_as_of: Option<NaiveDate>,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Status taxonomy driving fake-approval / fake-buyout / trash decisions.
/// Substring matching is case-insensitive. The defaults are the English
/// status texts; feeds with localized CRM statuses override these lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Status groups in which an approval can be genuine at all.
    #[serde(default = "default_good_approve_groups")]
    pub good_approve_status_groups: Vec<String>,

    /// Marker for orders parked as "send later"; checked before the date
    /// rules, so it wins even for otherwise healthy leads.
    #[serde(default = "default_send_later_marker")]
    pub send_later_marker: String,

    /// Verbose-status substrings that invalidate an approval.
    #[serde(default = "default_bad_approve_substrings")]
    pub bad_approve_substrings: Vec<String>,

    /// Verbose/group substrings marking a lead as trash regardless of the
    /// explicit trash flag.
    #[serde(default = "default_trash_substrings")]
    pub trash_substrings: Vec<String>,

    /// Status group a genuine buyout must carry.
    #[serde(default = "default_paid_group")]
    pub paid_status_group: String,

    /// Status group of leads still being worked.
    #[serde(default = "default_processing_group")]
    pub processing_status_group: String,
}

impl AnalyzerConfig {
    pub fn from_json(json: &str) -> KpiResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The as-of date used for plan-vs-recommendation comparisons.
    pub fn plan_as_of_date(&self) -> NaiveDate {
        self.plan_as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            effective_call_seconds: default_effective_call_seconds(),
            min_plan_efficiency: default_min_plan_efficiency(),
            calls_count_for_analyze: default_calls_count_for_analyze(),
            top_operator_share: default_top_operator_share(),
            top_operator_min: default_top_operator_min(),
            top_operator_max: default_top_operator_max(),
            efficiency_tolerance: default_efficiency_tolerance(),
            percent_tolerance: default_percent_tolerance(),
            min_percent_plan: default_min_percent_plan(),
            min_confirmation_price: default_min_confirmation_price(),
            approve_blend_factor: default_approve_blend_factor(),
            approve_clamp_width: default_approve_clamp_width(),
            buyout_nudge: default_buyout_nudge(),
            strict_rows: false,
            plan_as_of: None,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            good_approve_status_groups: default_good_approve_groups(),
            send_later_marker: default_send_later_marker(),
            bad_approve_substrings: default_bad_approve_substrings(),
            trash_substrings: default_trash_substrings(),
            paid_status_group: default_paid_group(),
            processing_status_group: default_processing_group(),
        }
    }
}

fn default_effective_call_seconds() -> i64 {
    60
}
fn default_min_plan_efficiency() -> f64 {
    0.1
}
fn default_calls_count_for_analyze() -> u64 {
    30
}
fn default_top_operator_share() -> f64 {
    0.4
}
fn default_top_operator_min() -> usize {
    3
}
fn default_top_operator_max() -> usize {
    5
}
fn default_efficiency_tolerance() -> f64 {
    0.2
}
fn default_percent_tolerance() -> f64 {
    1.0
}
fn default_min_percent_plan() -> f64 {
    0.1
}
fn default_min_confirmation_price() -> f64 {
    1.0
}
fn default_approve_blend_factor() -> f64 {
    0.3
}
fn default_approve_clamp_width() -> f64 {
    5.0
}
fn default_buyout_nudge() -> f64 {
    1.02
}

fn default_good_approve_groups() -> Vec<String> {
    ["accepted", "shipped", "paid", "return"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_send_later_marker() -> String {
    "send later".to_string()
}
fn default_bad_approve_substrings() -> Vec<String> {
    [
        "cancel",
        "prepayment",
        "4+ days",
        "day 4",
        "day 3",
        "day 2",
        "day 1",
        "callback",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_trash_substrings() -> Vec<String> {
    ["trash", "spam", "defect", "duplicate", "test order"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_paid_group() -> String {
    "paid".to_string()
}
fn default_processing_group() -> String {
    "processing".to_string()
}
