//! Recommendation value objects and the operator-ranking engine.
//!
//! Efficiency here is calls-per-lead, the KPI plan's own unit, so *lower*
//! is *better* and the qualified ranking sorts ascending. Every produced
//! recommendation carries an audit comment recording exactly which
//! operators and volumes went into it.

use crate::{config::AnalyzerConfig, hierarchy::CommonItem, stat_utils::safe_div};
use serde::Serialize;
use std::collections::HashSet;

/// A computed target plus its justification. `value: None` means
/// "insufficient data" and must propagate as "no correction possible",
/// never as zero.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub value: Option<f64>,
    pub comment: String,
}

impl Recommendation {
    pub fn new(value: f64, comment: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            comment: comment.into(),
        }
    }

    pub fn none(comment: impl Into<String>) -> Self {
        Self {
            value: None,
            comment: comment.into(),
        }
    }
}

impl Default for Recommendation {
    fn default() -> Self {
        Self::none("")
    }
}

/// The top-performer pool selected for plan derivation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TopOperators {
    /// `None` when too few operators qualified.
    pub keys: Option<Vec<String>>,
    pub comment: String,
}

pub struct RecommendationEngine {
    calls_count_for_analyze: u64,
    top_share: f64,
    top_min: usize,
    top_max: usize,
}

impl RecommendationEngine {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            calls_count_for_analyze: config.calls_count_for_analyze,
            top_share: config.top_operator_share,
            top_min: config.top_operator_min,
            top_max: config.top_operator_max,
        }
    }

    /// An operator is statistically meaningful once it has both enough
    /// effective-call volume and a nonzero rate.
    fn qualifies(&self, operator: &CommonItem) -> bool {
        operator.stat.calls_effective_count >= self.calls_count_for_analyze
            && operator.stat.effective_rate > 0.0
    }

    /// Qualified operators ascending by rate (best first), then everyone
    /// else in key order.
    pub fn sort_operators_by_efficiency<'a>(
        &self,
        operators: impl IntoIterator<Item = &'a CommonItem>,
    ) -> Vec<&'a CommonItem> {
        let (mut qualified, other): (Vec<_>, Vec<_>) =
            operators.into_iter().partition(|op| self.qualifies(op));
        qualified.sort_by(|a, b| {
            a.stat
                .effective_rate
                .partial_cmp(&b.stat.effective_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        qualified.extend(other);
        qualified
    }

    /// Take round(qualified * share) operators, clamped to
    /// [top_min, top_max], from the front of the sorted ranking.
    pub fn select_top_operators(&self, sorted: &[&CommonItem]) -> TopOperators {
        let qualified = sorted.iter().filter(|op| self.qualifies(op)).count();
        let mut comment = format!("Operators qualified for analysis: {qualified}\n");

        let mut target = (qualified as f64 * self.top_share).round() as usize;
        if target < self.top_min {
            comment += &format!("Insufficient operators for plan calculation ({target})");
            return TopOperators {
                keys: None,
                comment,
            };
        }
        if target > self.top_max {
            target = self.top_max;
        }
        comment += &format!("Operators taken for efficiency calculation: {target}\n--\n");

        let mut keys = Vec::with_capacity(target);
        let mut total_calls = 0u64;
        let mut total_leads = 0u64;
        for op in sorted {
            if keys.len() >= target {
                break;
            }
            if !self.qualifies(op) {
                continue;
            }
            keys.push(op.key.clone());
            total_calls += op.stat.calls_effective_count;
            total_leads += op.stat.leads_effective_count;
            comment += &format!(
                "\t{} calls: {} approvals: {}\n",
                op.key, op.stat.calls_effective_count, op.stat.leads_effective_count,
            );
        }
        comment += &format!(
            "--\nCalls: {total_calls} leads: {total_leads}\nResult: {}\n",
            safe_div(total_calls as f64, total_leads as f64),
        );

        TopOperators {
            keys: Some(keys),
            comment,
        }
    }

    /// Pooled calls-per-lead across the top performers; `None` when the
    /// pool is missing or its combined volume is still too small to trust.
    pub fn recommended_efficiency(
        &self,
        sorted: &[&CommonItem],
        top: &TopOperators,
    ) -> Recommendation {
        let Some(keys) = top.keys.as_ref() else {
            return Recommendation::none("Insufficient operators to make a decision");
        };
        let selected: HashSet<&str> = keys.iter().map(String::as_str).collect();

        let mut total_calls = 0u64;
        let mut total_leads = 0u64;
        let mut comment = String::new();
        for op in sorted {
            if !selected.contains(op.key.as_str()) {
                continue;
            }
            comment += &format!(
                "\t{} calls: {} approvals: {}\n",
                op.key, op.stat.calls_effective_count, op.stat.leads_effective_count,
            );
            total_calls += op.stat.calls_effective_count;
            total_leads += op.stat.leads_effective_count;
        }

        let result = safe_div(total_calls as f64, total_leads as f64);
        comment += &format!("--\nCalls: {total_calls} leads: {total_leads}\nResult: {result}\n");

        if total_calls < self.calls_count_for_analyze {
            comment += "Insufficient calls to make a decision";
            return Recommendation {
                value: None,
                comment,
            };
        }
        Recommendation {
            value: Some(result),
            comment,
        }
    }
}
