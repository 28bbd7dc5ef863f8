//! Flat report export.
//!
//! Flattens the finalized category tree into one row per entity, tagged by
//! level, so downstream consumers (spreadsheets, the runner's JSON output)
//! never have to walk the tree themselves.

use crate::{
    analyzer::KpiAnalyzer,
    correction::Correction,
    error::{KpiError, KpiResult},
    hierarchy::{CategoryItem, CommonItem},
    recommendation::{Recommendation, TopOperators},
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Category,
    Offer,
    Operator,
    Affiliate,
}

#[derive(Debug, Serialize)]
pub struct ReportRow {
    pub kind: RowKind,
    pub category: String,
    pub key: String,
    pub description: String,

    pub calls_effective_count: u64,
    pub leads_effective_count: u64,
    pub effective_rate: f64,
    pub effective_percent: Option<f64>,
    pub expecting_effective_rate: Option<f64>,
    pub kpi_calculation_errors: String,

    pub leads_non_trash_count: u64,
    pub leads_approved_count: u64,
    pub leads_buyout_count: u64,
    pub approve_percent_fact: Option<f64>,
    pub buyout_percent_fact: Option<f64>,
    pub expecting_approve_leads: Option<f64>,
    pub expecting_buyout_leads: Option<f64>,

    pub plan_id: Option<i64>,
    pub plan_updated_at: Option<String>,
    pub planned_efficiency: Option<f64>,
    pub planned_efficiency_updated_at: Option<String>,
    pub planned_approve: Option<f64>,
    pub planned_approve_updated_at: Option<String>,
    pub planned_buyout: Option<f64>,
    pub planned_buyout_updated_at: Option<String>,
    pub planned_confirmation_price: Option<f64>,
    pub planned_confirmation_price_updated_at: Option<String>,

    pub recommended_efficiency: Option<Recommendation>,
    pub recommended_approve: Option<Recommendation>,
    pub recommended_buyout: Option<Recommendation>,
    pub recommended_confirmation_price: Option<Recommendation>,

    pub efficiency_correction: Option<Correction>,
    pub approve_correction: Option<Correction>,
    pub buyout_correction: Option<Correction>,
    pub confirmation_price_correction: Option<Correction>,

    /// Category rows only.
    pub top_operators: Option<TopOperators>,
}

#[derive(Debug, Serialize)]
pub struct KpiReport {
    pub run_id: Uuid,
    pub generated_at: String,
    pub rows: Vec<ReportRow>,
}

impl KpiReport {
    pub fn to_json(&self) -> KpiResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn build_report(analyzer: &KpiAnalyzer) -> KpiResult<KpiReport> {
    if !analyzer.is_finalized() {
        return Err(KpiError::NotFinalized);
    }

    let mut rows = Vec::new();
    for (name, category) in analyzer.categories() {
        rows.push(category_row(name, category));
        for offer in category.offers.values() {
            rows.push(item_row(RowKind::Offer, name, offer));
        }
        for operator in category.operators.values() {
            rows.push(item_row(RowKind::Operator, name, operator));
        }
        for affiliate in category.affiliates.values() {
            rows.push(item_row(RowKind::Affiliate, name, affiliate));
        }
    }

    Ok(KpiReport {
        run_id: analyzer.run_id,
        generated_at: chrono::Local::now().to_rfc3339(),
        rows,
    })
}

fn category_row(name: &str, category: &CategoryItem) -> ReportRow {
    ReportRow {
        kind: RowKind::Category,
        category: name.to_string(),
        key: category.key.clone(),
        description: category.description.clone(),
        calls_effective_count: category.stat.calls_effective_count,
        leads_effective_count: category.stat.leads_effective_count,
        effective_rate: category.stat.effective_rate,
        effective_percent: category.stat.effective_percent,
        expecting_effective_rate: category.stat.expecting_effective_rate,
        kpi_calculation_errors: category.stat.calls.kpi_calculation_errors.clone(),
        leads_non_trash_count: category.lead_container.leads_non_trash_count,
        leads_approved_count: category.lead_container.leads_approved_count,
        leads_buyout_count: category.lead_container.leads_buyout_count,
        approve_percent_fact: category.approve_percent_fact,
        buyout_percent_fact: category.buyout_percent_fact,
        expecting_approve_leads: category.expecting_approve_leads,
        expecting_buyout_leads: category.expecting_buyout_leads,
        plan_id: None,
        plan_updated_at: None,
        planned_efficiency: None,
        planned_efficiency_updated_at: None,
        planned_approve: None,
        planned_approve_updated_at: None,
        planned_buyout: None,
        planned_buyout_updated_at: None,
        planned_confirmation_price: None,
        planned_confirmation_price_updated_at: None,
        recommended_efficiency: Some(category.recommended_efficiency.clone()),
        recommended_approve: Some(category.recommended_approve.clone()),
        recommended_buyout: Some(category.recommended_buyout.clone()),
        recommended_confirmation_price: Some(category.recommended_confirmation_price.clone()),
        efficiency_correction: None,
        approve_correction: None,
        buyout_correction: None,
        confirmation_price_correction: None,
        top_operators: Some(category.top_operators.clone()),
    }
}

fn item_row(kind: RowKind, category_name: &str, item: &CommonItem) -> ReportRow {
    ReportRow {
        kind,
        category: category_name.to_string(),
        key: item.key.clone(),
        description: item.description.clone(),
        calls_effective_count: item.stat.calls_effective_count,
        leads_effective_count: item.stat.leads_effective_count,
        effective_rate: item.stat.effective_rate,
        effective_percent: item.stat.effective_percent,
        expecting_effective_rate: item.stat.expecting_effective_rate,
        kpi_calculation_errors: item.stat.calls.kpi_calculation_errors.clone(),
        leads_non_trash_count: item.lead_container.leads_non_trash_count,
        leads_approved_count: item.lead_container.leads_approved_count,
        leads_buyout_count: item.lead_container.leads_buyout_count,
        approve_percent_fact: None,
        buyout_percent_fact: None,
        expecting_approve_leads: item.expecting_approve_leads,
        expecting_buyout_leads: item.expecting_buyout_leads,
        plan_id: item.plan.as_ref().map(|p| p.id),
        plan_updated_at: item.plan.as_ref().and_then(|p| p.updated_at.clone()),
        planned_efficiency: item.plan.as_ref().and_then(|p| p.operator_efficiency),
        planned_efficiency_updated_at: item
            .plan
            .as_ref()
            .and_then(|p| p.operator_efficiency_updated_at.clone()),
        planned_approve: item.plan.as_ref().and_then(|p| p.planned_approve),
        planned_approve_updated_at: item
            .plan
            .as_ref()
            .and_then(|p| p.planned_approve_updated_at.clone()),
        planned_buyout: item.plan.as_ref().and_then(|p| p.planned_buyout),
        planned_buyout_updated_at: item
            .plan
            .as_ref()
            .and_then(|p| p.planned_buyout_updated_at.clone()),
        planned_confirmation_price: item.plan.as_ref().and_then(|p| p.confirmation_price),
        planned_confirmation_price_updated_at: item
            .plan
            .as_ref()
            .and_then(|p| p.confirmation_price_updated_at.clone()),
        recommended_efficiency: item.recommended_efficiency.clone(),
        recommended_approve: item.recommended_approve.clone(),
        recommended_buyout: item.recommended_buyout.clone(),
        recommended_confirmation_price: item.recommended_confirmation_price.clone(),
        efficiency_correction: if kind == RowKind::Offer {
            Some(item.efficiency_correction.clone())
        } else {
            None
        },
        approve_correction: if kind == RowKind::Offer {
            Some(item.approve_correction.clone())
        } else {
            None
        },
        buyout_correction: if kind == RowKind::Offer {
            Some(item.buyout_correction.clone())
        } else {
            None
        },
        confirmation_price_correction: if kind == RowKind::Offer {
            Some(item.confirmation_price_correction.clone())
        } else {
            None
        },
        top_operators: None,
    }
}
