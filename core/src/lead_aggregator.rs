//! Per-entity approval-funnel lead accounting.
//!
//! Leads are deduplicated by id; classification is deferred to finalize so
//! every lead is judged exactly once, against the full classifier state.

use crate::{
    lead_classifier::LeadClassifier,
    rows::LeadRow,
    types::{AffiliateId, LeadId, OfferId, UNATTRIBUTED_OFFER},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Lead {
    pub lead_id: LeadId,
    pub offer_id: OfferId,
    pub affiliate_id: AffiliateId,
    pub operator_name: String,
    pub approved_at: Option<String>,
    pub canceled_at: Option<String>,
    pub status_verbose: String,
    pub status_group: String,
    /// Populated at finalize via the classifier.
    pub is_salary_pay: bool,
    pub not_pay_reason: String,
}

impl Lead {
    pub fn from_row(row: &LeadRow) -> Self {
        Self {
            lead_id: row.lead_id,
            offer_id: row.offer_id,
            affiliate_id: row.affiliate_id,
            operator_name: row.operator_name.clone(),
            approved_at: row.approved_at.clone(),
            canceled_at: row.canceled_at.clone(),
            status_verbose: row.status_verbose.clone(),
            status_group: row.status_group.clone(),
            is_salary_pay: false,
            not_pay_reason: String::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct LeadAggregator {
    leads: BTreeMap<LeadId, Lead>,
    /// Salary-payable leads that could not be attributed to an offer.
    pub leads_without_calculation: u64,
    /// Salary-payable leads entering the efficiency denominator.
    pub leads_with_calculation: u64,
    finalized: bool,
}

impl LeadAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repeated lead id is ignored — upstream joins re-observe leads
    /// across pages, and the first sighting wins.
    pub fn push_lead(&mut self, lead: Lead) {
        if self.leads.contains_key(&lead.lead_id) {
            log::debug!("duplicate lead push ignored: id {}", lead.lead_id);
            return;
        }
        self.leads.insert(lead.lead_id, lead);
    }

    pub fn lead_count(&self) -> usize {
        self.leads.len()
    }

    pub fn leads(&self) -> impl Iterator<Item = &Lead> {
        self.leads.values()
    }

    pub fn finalize(&mut self, classifier: &LeadClassifier) {
        if self.finalized {
            log::debug!("lead aggregator already finalized");
            return;
        }
        self.finalized = true;

        for lead in self.leads.values_mut() {
            let verdict = classifier.is_fake_approval(
                &lead.status_verbose,
                &lead.status_group,
                lead.approved_at.as_deref(),
                lead.canceled_at.as_deref(),
            );
            lead.is_salary_pay = verdict.is_none();
            lead.not_pay_reason = verdict.unwrap_or_default();

            if !lead.is_salary_pay {
                continue;
            }
            if lead.offer_id == UNATTRIBUTED_OFFER {
                self.leads_without_calculation += 1;
            } else {
                self.leads_with_calculation += 1;
            }
        }
    }
}
