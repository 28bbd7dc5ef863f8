//! Plan-vs-recommendation correction checks.
//!
//! One pure function per KPI dimension, applied uniformly:
//! `Some(reason)` flags the dimension for correction, `None` means the
//! configured plan is within tolerance. A flag fires when the plan is
//! missing, its value is unset or below the validity floor, no
//! recommendation could be computed, or plan and recommendation disagree
//! beyond the dimension's tolerance.

use crate::{config::AnalyzerConfig, kpi_plan::KpiPlanRecord, recommendation::Recommendation};
use serde::Serialize;

/// A correction verdict attached to one dimension of one entity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Correction {
    pub flagged: bool,
    pub reason: String,
}

impl Correction {
    pub fn apply(&mut self, verdict: Option<String>) {
        match verdict {
            Some(reason) => {
                self.flagged = true;
                self.reason = reason;
            }
            None => {
                self.flagged = false;
                self.reason.clear();
            }
        }
    }
}

pub fn check_efficiency(
    config: &AnalyzerConfig,
    plan: Option<&KpiPlanRecord>,
    recommendation: &Recommendation,
) -> Option<String> {
    let plan = match plan {
        Some(p) => p,
        None => return Some("KPI plan not found".to_string()),
    };
    let planned = match plan.operator_efficiency {
        Some(v) if v >= config.min_plan_efficiency => v,
        other => {
            return Some(format!(
                "Efficiency target not set or below the validity floor (<{}): {:?}",
                config.min_plan_efficiency, other,
            ))
        }
    };
    let recommended = match recommendation.value {
        Some(v) => v,
        None => return Some("No recommendation could be computed".to_string()),
    };
    if (recommended - planned).abs() > config.efficiency_tolerance {
        return Some(format!(
            "Recommended efficiency ({recommended}) differs from planned ({planned}) by more than {}",
            config.efficiency_tolerance,
        ));
    }
    None
}

pub fn check_approve(
    config: &AnalyzerConfig,
    plan: Option<&KpiPlanRecord>,
    recommendation: &Recommendation,
) -> Option<String> {
    check_percent_dimension(
        config,
        plan.map(|p| p.planned_approve),
        recommendation,
        "approve",
    )
}

pub fn check_buyout(
    config: &AnalyzerConfig,
    plan: Option<&KpiPlanRecord>,
    recommendation: &Recommendation,
) -> Option<String> {
    check_percent_dimension(
        config,
        plan.map(|p| p.planned_buyout),
        recommendation,
        "buyout",
    )
}

fn check_percent_dimension(
    config: &AnalyzerConfig,
    planned: Option<Option<f64>>,
    recommendation: &Recommendation,
    dimension: &str,
) -> Option<String> {
    let planned = match planned {
        Some(p) => p,
        None => return Some("KPI plan not found".to_string()),
    };
    let planned = match planned {
        Some(v) if v >= config.min_percent_plan => v,
        other => {
            return Some(format!(
                "Planned {dimension} not set or critically low (<{}): {:?}",
                config.min_percent_plan, other,
            ))
        }
    };
    let recommended = match recommendation.value {
        Some(v) => v,
        None => return Some("No recommendation could be computed".to_string()),
    };
    if (planned - recommended).abs() > config.percent_tolerance {
        return Some(format!(
            "Planned {dimension} ({planned}) differs from recommended ({recommended}) by more than {} pp",
            config.percent_tolerance,
        ));
    }
    None
}

pub fn check_confirmation_price(
    config: &AnalyzerConfig,
    plan: Option<&KpiPlanRecord>,
    category_max: f64,
) -> Option<String> {
    let plan = match plan {
        Some(p) => p,
        None => return Some("KPI plan not found".to_string()),
    };
    let price = match plan.confirmation_price {
        Some(v) if v >= config.min_confirmation_price => v,
        _ => return Some("Confirmation price not set or critically low".to_string()),
    };
    if category_max < config.min_confirmation_price {
        return Some(
            "Could not determine the category's maximum confirmation price".to_string(),
        );
    }
    if price != category_max {
        return Some(format!(
            "Confirmation price ({price}) differs from the category maximum ({category_max})"
        ));
    }
    None
}
