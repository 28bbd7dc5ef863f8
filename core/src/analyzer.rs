//! Run orchestration: ingest rows, bucket them by category, finalize.
//!
//! The analyzer is a push-based accumulator. Feed it the offer catalog, the
//! KPI plan feed, and the three row streams in any order, then call
//! `finalize` exactly once; pushes after finalize are rejected. Malformed
//! rows are dropped with a warning by default, or abort the run when
//! `strict_rows` is set.

use crate::{
    call_aggregator::Call,
    config::AnalyzerConfig,
    error::{KpiError, KpiResult},
    hierarchy::CategoryItem,
    kpi_plan::KpiPlanIndex,
    lead_aggregator::Lead,
    lead_classifier::LeadClassifier,
    lead_container::LeadContainerEntry,
    rows::{CallRow, KpiPlanRow, LeadContainerRow, LeadRow, OfferRow},
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Shared read-only state threaded through every `finalize` in the tree.
pub struct FinalizeContext<'a> {
    pub config: &'a AnalyzerConfig,
    pub classifier: &'a LeadClassifier,
    pub plans: &'a KpiPlanIndex,
    /// Date offer plans are resolved against (current targets, not the
    /// analysis period).
    pub plan_as_of: NaiveDate,
}

pub struct KpiAnalyzer {
    pub run_id: Uuid,
    config: AnalyzerConfig,
    classifier: LeadClassifier,
    plans: KpiPlanIndex,
    categories: BTreeMap<String, CategoryItem>,
    dropped_rows: u64,
    finalized: bool,
}

impl KpiAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let classifier = LeadClassifier::new(config.classifier.clone());
        let plans = KpiPlanIndex::new(config.min_plan_efficiency);
        Self {
            run_id: Uuid::new_v4(),
            config,
            classifier,
            plans,
            categories: BTreeMap::new(),
            dropped_rows: 0,
            finalized: false,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn plans(&self) -> &KpiPlanIndex {
        &self.plans
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Rows dropped under the lenient malformed-row policy.
    pub fn dropped_row_count(&self) -> u64 {
        self.dropped_rows
    }

    fn category(&mut self, name: &str) -> &mut CategoryItem {
        self.categories
            .entry(name.to_string())
            .or_insert_with(|| CategoryItem::new(name))
    }

    fn guard_open(&self) -> KpiResult<()> {
        if self.finalized {
            return Err(KpiError::AlreadyFinalized);
        }
        Ok(())
    }

    fn reject_row(&mut self, kind: &'static str, detail: String) -> KpiResult<()> {
        if self.config.strict_rows {
            return Err(KpiError::MalformedRow { kind, detail });
        }
        log::warn!("dropping malformed {kind} row: {detail}");
        self.dropped_rows += 1;
        Ok(())
    }

    /// Register a catalog offer so it appears in the report even with no
    /// traffic in the period.
    pub fn push_offer(&mut self, row: &OfferRow) -> KpiResult<()> {
        self.guard_open()?;
        self.category(&row.category_name)
            .register_offer(row.id, &row.name);
        Ok(())
    }

    pub fn push_kpi_plan(&mut self, row: KpiPlanRow) -> KpiResult<()> {
        self.guard_open()?;
        self.plans.push(row)
    }

    pub fn push_call(&mut self, row: &CallRow) -> KpiResult<()> {
        self.guard_open()?;
        match Call::from_row(row) {
            Ok(call) => {
                self.category(&row.category_name).push_call(call);
                Ok(())
            }
            Err(detail) => self.reject_row("call", detail),
        }
    }

    pub fn push_lead(&mut self, row: &LeadRow) -> KpiResult<()> {
        self.guard_open()?;
        self.category(&row.category_name).push_lead(Lead::from_row(row));
        Ok(())
    }

    pub fn push_lead_container(&mut self, row: &LeadContainerRow) -> KpiResult<()> {
        self.guard_open()?;
        self.category(&row.category_name)
            .push_lead_container(LeadContainerEntry::from_row(row));
        Ok(())
    }

    /// Run every category's finalize pipeline. Repeated calls are no-ops.
    pub fn finalize(&mut self) {
        if self.finalized {
            log::debug!("analyzer already finalized");
            return;
        }
        self.finalized = true;

        let plan_as_of = self.config.plan_as_of_date();
        let ctx = FinalizeContext {
            config: &self.config,
            classifier: &self.classifier,
            plans: &self.plans,
            plan_as_of,
        };
        for (name, category) in self.categories.iter_mut() {
            log::info!("finalizing category '{name}'");
            category.finalize(&ctx);
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = (&String, &CategoryItem)> {
        self.categories.iter()
    }

    pub fn category_by_name(&self, name: &str) -> Option<&CategoryItem> {
        self.categories.get(name)
    }

    /// All accumulated plan-lookup diagnostics, per category.
    pub fn kpi_calculation_errors(&self) -> String {
        let mut out = String::new();
        for (name, category) in &self.categories {
            let errors = &category.stat.calls.kpi_calculation_errors;
            if !errors.is_empty() {
                out += &format!("[{name}]\n{errors}");
            }
        }
        out
    }
}
