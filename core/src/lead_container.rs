//! Lifecycle ("container") view of leads: created → approved/canceled →
//! bought out. Feeds the approve-rate and buyout-rate facts, independently
//! of the call-efficiency funnel.

use crate::{
    lead_classifier::LeadClassifier,
    rows::LeadContainerRow,
    types::{AffiliateId, LeadId, OfferId},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct LeadContainerEntry {
    pub lead_id: LeadId,
    pub offer_id: OfferId,
    pub affiliate_id: AffiliateId,
    pub created_at: Option<String>,
    pub approved_at: Option<String>,
    pub canceled_at: Option<String>,
    pub buyout_at: Option<String>,
    pub status_verbose: String,
    pub status_group: String,
    pub is_trash: bool,
    // Derived at finalize.
    pub is_non_trash: bool,
    pub is_genuinely_approved: bool,
    pub is_genuinely_bought_out: bool,
}

impl LeadContainerEntry {
    pub fn from_row(row: &LeadContainerRow) -> Self {
        Self {
            lead_id: row.lead_id,
            offer_id: row.offer_id,
            affiliate_id: row.affiliate_id,
            created_at: row.created_at.clone(),
            approved_at: row.approved_at.clone(),
            canceled_at: row.canceled_at.clone(),
            buyout_at: row.buyout_at.clone(),
            status_verbose: row.status_verbose.clone(),
            status_group: row.status_group.clone(),
            is_trash: row.is_trash,
            is_non_trash: false,
            is_genuinely_approved: false,
            is_genuinely_bought_out: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct LeadContainer {
    entries: BTreeMap<LeadId, LeadContainerEntry>,
    pub leads_non_trash_count: u64,
    pub leads_approved_count: u64,
    pub leads_buyout_count: u64,
    finalized: bool,
}

impl LeadContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Containers are re-observed across category/offer joins; a repeated
    /// lead id is simply ignored.
    pub fn push_lead(&mut self, entry: LeadContainerEntry) {
        self.entries.entry(entry.lead_id).or_insert(entry);
    }

    pub fn lead_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LeadContainerEntry> {
        self.entries.values()
    }

    pub fn finalize(&mut self, classifier: &LeadClassifier) {
        if self.finalized {
            log::debug!("lead container already finalized");
            return;
        }
        self.finalized = true;

        for entry in self.entries.values_mut() {
            entry.is_non_trash = !entry.is_trash
                && !classifier.is_trash_status(&entry.status_group, &entry.status_verbose);
            if !entry.is_non_trash {
                continue;
            }
            self.leads_non_trash_count += 1;

            let approved_present = entry.approved_at.as_deref().is_some_and(|a| !a.is_empty());
            entry.is_genuinely_approved = approved_present
                && classifier
                    .is_fake_approval(
                        &entry.status_verbose,
                        &entry.status_group,
                        entry.approved_at.as_deref(),
                        entry.canceled_at.as_deref(),
                    )
                    .is_none();
            if !entry.is_genuinely_approved {
                continue;
            }
            self.leads_approved_count += 1;

            let buyout_present = entry.buyout_at.as_deref().is_some_and(|b| !b.is_empty());
            entry.is_genuinely_bought_out = buyout_present
                && classifier
                    .is_fake_buyout(&entry.status_group, entry.buyout_at.as_deref())
                    .is_none();
            if entry.is_genuinely_bought_out {
                self.leads_buyout_count += 1;
            }
        }
    }
}
