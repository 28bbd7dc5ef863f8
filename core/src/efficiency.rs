//! The per-entity efficiency statistic.
//!
//! Combines the call and lead accumulators and, at finalize, derives the
//! three headline figures:
//!   - effective_rate        — effective calls per payable lead (the same
//!                             unit the KPI plan's operator efficiency uses)
//!   - effective_percent     — payable leads as a share of the plan-implied
//!                             expectation
//!   - expecting_effective_rate — effective calls per plan-implied lead
//!
//! The last two are `None` whenever the expected-approved-leads projection
//! was poisoned by a failed plan lookup.

use crate::{
    call_aggregator::{Call, CallAggregator},
    lead_aggregator::{Lead, LeadAggregator},
    stat_utils::{safe_div, safe_percent},
};

#[derive(Debug)]
pub struct EfficiencyStat {
    pub calls: CallAggregator,
    pub leads: LeadAggregator,
    /// All effective groups, attributed or not.
    pub calls_effective_count: u64,
    /// All salary-payable leads, attributed or not.
    pub leads_effective_count: u64,
    pub effective_rate: f64,
    pub effective_percent: Option<f64>,
    pub expecting_effective_rate: Option<f64>,
    finalized: bool,
}

impl Default for EfficiencyStat {
    fn default() -> Self {
        Self::new()
    }
}

impl EfficiencyStat {
    pub fn new() -> Self {
        Self {
            calls: CallAggregator::new(),
            leads: LeadAggregator::new(),
            calls_effective_count: 0,
            leads_effective_count: 0,
            effective_rate: 0.0,
            effective_percent: None,
            expecting_effective_rate: None,
            finalized: false,
        }
    }

    pub fn push_call(&mut self, call: Call) {
        self.calls.push_call(call);
    }

    pub fn push_lead(&mut self, lead: Lead) {
        self.leads.push_lead(lead);
    }

    pub fn finalize(&mut self, ctx: &crate::analyzer::FinalizeContext<'_>) {
        if self.finalized {
            log::debug!("efficiency stat already finalized");
            return;
        }
        self.finalized = true;

        self.calls
            .finalize(ctx.plans, ctx.config.effective_call_seconds);
        self.leads.finalize(ctx.classifier);

        self.calls_effective_count =
            self.calls.calls_with_calculation + self.calls.calls_without_calculation;
        self.leads_effective_count =
            self.leads.leads_with_calculation + self.leads.leads_without_calculation;

        self.effective_rate = safe_div(
            self.calls.calls_with_calculation as f64,
            self.leads.leads_with_calculation as f64,
        );

        match self.calls.expected_approved_leads {
            Some(expected) => {
                self.effective_percent = Some(safe_percent(
                    self.leads.leads_with_calculation as f64,
                    expected,
                ));
                self.expecting_effective_rate = Some(safe_div(
                    self.calls.calls_with_calculation as f64,
                    expected,
                ));
            }
            None => {
                self.effective_percent = None;
                self.expecting_effective_rate = None;
            }
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}
