//! Call events, contact-attempt groups, and the plan-driven call counters.
//!
//! Raw call rows are deduplicated twice: physically identical rows collapse
//! by telephony uniqueid (keeping the max duration seen), and distinct calls
//! collapse into one `CallGroup` per (date, operator, lead) — one contact
//! attempt. A group is effective when any of its calls reaches the talk-time
//! threshold; the first such call in push order is the group's credit
//! representative.

use crate::{
    kpi_plan::KpiPlanIndex,
    rows::CallRow,
    types::{AffiliateId, CallId, LeadId, OfferId, OperatorId, UNATTRIBUTED_OFFER},
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
pub struct Call {
    pub id: CallId,
    pub uniqueid: String,
    pub offer_id: OfferId,
    pub affiliate_id: AffiliateId,
    pub operator_id: OperatorId,
    pub operator_name: String,
    pub lead_id: LeadId,
    pub call_date: NaiveDate,
    /// Authoritative talk duration in seconds (see `from_row`).
    pub duration: i64,
}

impl Call {
    /// Validate a raw row into a call. The duration authority rule: the
    /// exact duration wins when it is present, non-negative, and shorter
    /// than the primary one, or when the primary is unset; a row with
    /// neither duration is a data error.
    pub fn from_row(row: &CallRow) -> Result<Self, String> {
        let exact = row.billsec_exact.filter(|e| *e >= 0);
        let duration = match (row.billsec, exact) {
            (Some(primary), Some(exact)) if exact < primary => exact,
            (Some(primary), _) => primary,
            (None, Some(exact)) => exact,
            (None, None) => return Err(format!("null duration on call id {}", row.id)),
        };

        let day = row
            .call_date
            .get(..10)
            .ok_or_else(|| format!("short call date '{}' on call id {}", row.call_date, row.id))?;
        let call_date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|_| format!("bad call date '{}' on call id {}", row.call_date, row.id))?;

        Ok(Self {
            id: row.id,
            uniqueid: row.uniqueid.clone(),
            offer_id: row.offer_id,
            affiliate_id: row.affiliate_id,
            operator_id: row.operator_id,
            operator_name: row.operator_name.clone(),
            lead_id: row.lead_id,
            call_date,
            duration,
        })
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            call_date: self.call_date,
            operator_id: self.operator_id,
            lead_id: self.lead_id,
        }
    }
}

/// One contact attempt: one operator, one lead, one day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub call_date: NaiveDate,
    pub operator_id: OperatorId,
    pub lead_id: LeadId,
}

#[derive(Debug)]
pub struct CallGroup {
    pub key: GroupKey,
    pub offer_id: OfferId,
    pub affiliate_id: AffiliateId,
    calls: Vec<Call>,
    by_uniqueid: HashMap<String, usize>,
    pub is_effective: bool,
    pub effective_count: u64,
    first_effective: Option<usize>,
    finalized: bool,
}

impl CallGroup {
    fn new(key: GroupKey, call: &Call) -> Self {
        Self {
            key,
            offer_id: call.offer_id,
            affiliate_id: call.affiliate_id,
            calls: Vec::new(),
            by_uniqueid: HashMap::new(),
            is_effective: false,
            effective_count: 0,
            first_effective: None,
            finalized: false,
        }
    }

    /// Merge a call into the group. A repeated uniqueid is the same
    /// physical call; keep the max duration seen for it.
    pub fn push_call(&mut self, call: Call) {
        match self.by_uniqueid.get(&call.uniqueid) {
            Some(&i) => {
                let existing = &mut self.calls[i];
                existing.duration = existing.duration.max(call.duration);
            }
            None => {
                self.by_uniqueid.insert(call.uniqueid.clone(), self.calls.len());
                self.calls.push(call);
            }
        }
    }

    /// Compute the effective subset. Push order decides the representative:
    /// the first call at or above the threshold.
    pub fn finalize(&mut self, effective_seconds: i64) {
        if self.finalized {
            log::debug!("call group {:?} already finalized", self.key);
            return;
        }
        self.finalized = true;

        for (i, call) in self.calls.iter().enumerate() {
            if call.duration >= effective_seconds {
                self.effective_count += 1;
                if self.first_effective.is_none() {
                    self.first_effective = Some(i);
                }
            }
        }
        self.is_effective = self.effective_count > 0;
    }

    pub fn first_effective_call(&self) -> Option<&Call> {
        self.first_effective.map(|i| &self.calls[i])
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }
}

/// Per-entity call accumulator.
#[derive(Debug, Default)]
pub struct CallAggregator {
    groups: BTreeMap<GroupKey, CallGroup>,
    /// Effective groups that could not be attributed to an offer.
    pub calls_without_calculation: u64,
    /// Effective groups that entered the plan-driven projection.
    pub calls_with_calculation: u64,
    /// Plan-implied approved-lead projection: one `1/plan_efficiency` slot
    /// per effective attributed group. `None` once poisoned by a lookup
    /// miss or an unusable plan; poisoning is permanent for the run.
    pub expected_approved_leads: Option<f64>,
    /// Accumulated non-blocking lookup diagnostics, one line per failure.
    pub kpi_calculation_errors: String,
    finalized: bool,
}

impl CallAggregator {
    pub fn new() -> Self {
        Self {
            expected_approved_leads: Some(0.0),
            ..Self::default()
        }
    }

    pub fn push_call(&mut self, call: Call) {
        let key = call.group_key();
        self.groups
            .entry(key.clone())
            .or_insert_with(|| CallGroup::new(key, &call))
            .push_call(call);
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> impl Iterator<Item = &CallGroup> {
        self.groups.values()
    }

    /// Credit representatives of every effective group, for billing export.
    pub fn effective_call_ids(&self) -> Vec<CallId> {
        self.groups
            .values()
            .filter(|g| g.is_effective)
            .filter_map(|g| g.first_effective_call())
            .map(|c| c.id)
            .collect()
    }

    pub fn finalize(&mut self, plans: &KpiPlanIndex, effective_seconds: i64) {
        if self.finalized {
            log::debug!("call aggregator already finalized");
            return;
        }
        self.finalized = true;

        let min_eff = plans.min_efficiency();
        for group in self.groups.values_mut() {
            group.finalize(effective_seconds);
            if !group.is_effective {
                continue;
            }

            if group.offer_id == UNATTRIBUTED_OFFER {
                self.calls_without_calculation += 1;
                continue;
            }

            self.calls_with_calculation += 1;
            let plan = plans.find_operator_efficiency(
                Some(group.affiliate_id),
                group.offer_id,
                group.key.call_date,
            );

            match plan {
                None => {
                    self.expected_approved_leads = None;
                    self.kpi_calculation_errors += &format!(
                        "Can't find a KPI plan for offer {} affiliate {}\n",
                        group.offer_id, group.affiliate_id,
                    );
                }
                Some(p) => match p.operator_efficiency {
                    Some(eff) if eff >= min_eff => {
                        if let Some(expected) = self.expected_approved_leads.as_mut() {
                            *expected += 1.0 / eff;
                        }
                    }
                    eff => {
                        self.expected_approved_leads = None;
                        self.kpi_calculation_errors += &format!(
                            "Unusable KPI plan for offer {} affiliate {}: efficiency {:?} (< {})\n",
                            group.offer_id, group.affiliate_id, eff, min_eff,
                        );
                    }
                },
            }
        }
    }
}
