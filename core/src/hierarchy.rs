//! The three-level aggregation tree: Category → {Offer, Operator, Affiliate}.
//!
//! CATEGORY FINALIZE ORDER (fixed, documented, never reordered):
//!   1. Operator stats (ranking input)
//!   2. Category-level stat + lead container
//!   3. Operator ranking, top-performer pool, recommended efficiency
//!   4. Per-offer plan lookup, offer finalize, confirmation-price max,
//!      expected approve/buyout accumulation (poison on any None)
//!   5. Category recommended approve (projection, damped, clamped to
//!      [fact, fact + clamp width])
//!   6. Category recommended buyout (flat relative nudge)
//!   7. Category recommended confirmation price (category max)
//!   8. Push category recommendations into offers, re-run their
//!      approve/buyout/price correction checks
//!   9. Affiliate stats (no plan comparisons for affiliates)
//!
//! Each level finalizes exactly once; repeats are logged no-ops, because
//! the orchestration reaches shared sub-objects from multiple paths.

use crate::{
    analyzer::FinalizeContext,
    call_aggregator::Call,
    correction::{self, Correction},
    efficiency::EfficiencyStat,
    kpi_plan::KpiPlanRecord,
    lead_aggregator::Lead,
    lead_container::{LeadContainer, LeadContainerEntry},
    recommendation::{Recommendation, RecommendationEngine, TopOperators},
    stat_utils::{safe_div, safe_percent},
    types::{AffiliateId, OfferId},
};
use std::collections::BTreeMap;

// ── Leaf entity ──────────────────────────────────────────────────────────────

/// One offer, operator, or affiliate within a category.
#[derive(Debug)]
pub struct CommonItem {
    pub key: String,
    pub description: String,
    pub stat: EfficiencyStat,
    pub lead_container: LeadContainer,
    /// Matched plan — offers only; operators and affiliates have none.
    pub plan: Option<KpiPlanRecord>,
    pub recommended_efficiency: Option<Recommendation>,
    pub recommended_approve: Option<Recommendation>,
    pub recommended_buyout: Option<Recommendation>,
    pub recommended_confirmation_price: Option<Recommendation>,
    pub efficiency_correction: Correction,
    pub approve_correction: Correction,
    pub buyout_correction: Correction,
    pub confirmation_price_correction: Correction,
    pub expecting_approve_leads: Option<f64>,
    pub expecting_buyout_leads: Option<f64>,
    pub operator_efficiency_fact: Option<f64>,
    finalized: bool,
}

impl CommonItem {
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            stat: EfficiencyStat::new(),
            lead_container: LeadContainer::new(),
            plan: None,
            recommended_efficiency: None,
            recommended_approve: None,
            recommended_buyout: None,
            recommended_confirmation_price: None,
            efficiency_correction: Correction::default(),
            approve_correction: Correction::default(),
            buyout_correction: Correction::default(),
            confirmation_price_correction: Correction::default(),
            expecting_approve_leads: None,
            expecting_buyout_leads: None,
            operator_efficiency_fact: None,
            finalized: false,
        }
    }

    pub fn push_call(&mut self, call: Call) {
        self.stat.push_call(call);
    }

    pub fn push_lead(&mut self, lead: Lead) {
        self.stat.push_lead(lead);
    }

    pub fn push_lead_container(&mut self, entry: LeadContainerEntry) {
        self.lead_container.push_lead(entry);
    }

    /// Stats-only finalize, for operators and affiliates.
    pub fn finalize_stats(&mut self, ctx: &FinalizeContext<'_>) {
        self.stat.finalize(ctx);
        self.lead_container.finalize(ctx.classifier);
        self.operator_efficiency_fact = Some(self.stat.effective_rate);
    }

    /// Full offer finalize: stats, plan-driven expectations, and the
    /// efficiency correction check. Requires `plan` and
    /// `recommended_efficiency` to be set by the owning category first.
    pub fn finalize_offer(&mut self, ctx: &FinalizeContext<'_>) {
        if self.finalized {
            log::debug!("item '{}' already finalized", self.key);
            return;
        }
        self.finalized = true;

        self.finalize_stats(ctx);

        if let Some(plan) = &self.plan {
            if let Some(approve) = plan.planned_approve {
                self.expecting_approve_leads =
                    Some(self.lead_container.leads_non_trash_count as f64 * (approve / 100.0));
            }
            if let Some(buyout) = plan.planned_buyout {
                self.expecting_buyout_leads =
                    Some(self.lead_container.leads_approved_count as f64 * (buyout / 100.0));
            }
        }

        let recommendation = self
            .recommended_efficiency
            .clone()
            .unwrap_or_default();
        self.efficiency_correction.apply(correction::check_efficiency(
            ctx.config,
            self.plan.as_ref(),
            &recommendation,
        ));
    }
}

// ── Category ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CategoryItem {
    pub key: String,
    pub description: String,
    pub offers: BTreeMap<OfferId, CommonItem>,
    pub operators: BTreeMap<String, CommonItem>,
    pub affiliates: BTreeMap<AffiliateId, CommonItem>,
    pub stat: EfficiencyStat,
    pub lead_container: LeadContainer,
    pub approve_percent_fact: Option<f64>,
    pub buyout_percent_fact: Option<f64>,
    /// Plan-implied approve/buyout rates; `None` when any offer's
    /// expectation is unavailable.
    pub approve_rate_plan: Option<f64>,
    pub buyout_rate_plan: Option<f64>,
    pub expecting_approve_leads: Option<f64>,
    pub expecting_buyout_leads: Option<f64>,
    pub top_operators: TopOperators,
    pub recommended_efficiency: Recommendation,
    pub recommended_approve: Recommendation,
    pub recommended_buyout: Recommendation,
    pub recommended_confirmation_price: Recommendation,
    pub max_confirmation_price: f64,
    finalized: bool,
}

impl CategoryItem {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            description: key.clone(),
            key,
            offers: BTreeMap::new(),
            operators: BTreeMap::new(),
            affiliates: BTreeMap::new(),
            stat: EfficiencyStat::new(),
            lead_container: LeadContainer::new(),
            approve_percent_fact: None,
            buyout_percent_fact: None,
            approve_rate_plan: None,
            buyout_rate_plan: None,
            expecting_approve_leads: Some(0.0),
            expecting_buyout_leads: Some(0.0),
            top_operators: TopOperators::default(),
            recommended_efficiency: Recommendation::default(),
            recommended_approve: Recommendation::default(),
            recommended_buyout: Recommendation::default(),
            recommended_confirmation_price: Recommendation::default(),
            max_confirmation_price: 0.0,
            finalized: false,
        }
    }

    pub fn register_offer(&mut self, offer_id: OfferId, name: &str) {
        self.offers
            .entry(offer_id)
            .or_insert_with(|| CommonItem::new(offer_id.to_string(), name));
    }

    pub fn push_call(&mut self, call: Call) {
        self.offers
            .entry(call.offer_id)
            .or_insert_with(|| CommonItem::new(call.offer_id.to_string(), ""))
            .push_call(call.clone());
        self.affiliates
            .entry(call.affiliate_id)
            .or_insert_with(|| CommonItem::new(call.affiliate_id.to_string(), ""))
            .push_call(call.clone());
        self.operators
            .entry(call.operator_name.clone())
            .or_insert_with(|| CommonItem::new(call.operator_name.clone(), ""))
            .push_call(call.clone());
        self.stat.push_call(call);
    }

    pub fn push_lead(&mut self, lead: Lead) {
        self.offers
            .entry(lead.offer_id)
            .or_insert_with(|| CommonItem::new(lead.offer_id.to_string(), ""))
            .push_lead(lead.clone());
        self.affiliates
            .entry(lead.affiliate_id)
            .or_insert_with(|| CommonItem::new(lead.affiliate_id.to_string(), ""))
            .push_lead(lead.clone());
        self.operators
            .entry(lead.operator_name.clone())
            .or_insert_with(|| CommonItem::new(lead.operator_name.clone(), ""))
            .push_lead(lead.clone());
        self.stat.push_lead(lead);
    }

    pub fn push_lead_container(&mut self, entry: LeadContainerEntry) {
        self.offers
            .entry(entry.offer_id)
            .or_insert_with(|| CommonItem::new(entry.offer_id.to_string(), ""))
            .push_lead_container(entry.clone());
        self.lead_container.push_lead(entry);
    }

    pub fn finalize(&mut self, ctx: &FinalizeContext<'_>) {
        if self.finalized {
            log::debug!("category '{}' already finalized", self.key);
            return;
        }
        self.finalized = true;

        // 1. Operator stats feed the ranking.
        for operator in self.operators.values_mut() {
            operator.finalize_stats(ctx);
        }

        // 2. Category aggregates.
        self.stat.finalize(ctx);
        self.lead_container.finalize(ctx.classifier);

        // 3. Rank and recommend.
        let engine = RecommendationEngine::new(ctx.config);
        let sorted = engine.sort_operators_by_efficiency(self.operators.values());
        let top = engine.select_top_operators(&sorted);
        let recommended = engine.recommended_efficiency(&sorted, &top);
        drop(sorted);
        self.top_operators = top;
        self.recommended_efficiency = recommended;

        self.approve_percent_fact = Some(safe_percent(
            self.lead_container.leads_approved_count as f64,
            self.lead_container.leads_non_trash_count as f64,
        ));
        self.buyout_percent_fact = Some(safe_percent(
            self.lead_container.leads_buyout_count as f64,
            self.lead_container.leads_approved_count as f64,
        ));

        // 4. Offers: plan lookup is against current targets, not the
        // analysis period.
        for (offer_id, offer) in self.offers.iter_mut() {
            offer.plan = ctx.plans.find(None, *offer_id, ctx.plan_as_of).cloned();
            offer.recommended_efficiency = Some(self.recommended_efficiency.clone());
            offer.finalize_offer(ctx);

            if let Some(price) = offer.plan.as_ref().and_then(|p| p.confirmation_price) {
                self.max_confirmation_price = self.max_confirmation_price.max(price);
            }
            accumulate(&mut self.expecting_approve_leads, offer.expecting_approve_leads);
            accumulate(&mut self.expecting_buyout_leads, offer.expecting_buyout_leads);
        }

        // 5–7. Category-level recommendations.
        self.recommended_approve = self.compute_recommended_approve(ctx);
        if let (Some(expected), true) = (
            self.expecting_buyout_leads,
            self.lead_container.leads_approved_count > 0,
        ) {
            self.buyout_rate_plan = Some(safe_div(
                expected,
                self.lead_container.leads_approved_count as f64,
            ));
        }
        let buyout_fact = self.buyout_percent_fact.unwrap_or(0.0);
        self.recommended_buyout = Recommendation::new(
            buyout_fact * ctx.config.buyout_nudge,
            format!("Current buyout: {buyout_fact:.2}, nudged up 2%"),
        );
        self.recommended_confirmation_price = Recommendation::new(
            self.max_confirmation_price,
            "Maximum confirmation price in the category",
        );

        // 8. Push recommendations down and re-check each offer's plan.
        for offer in self.offers.values_mut() {
            offer.recommended_approve = Some(self.recommended_approve.clone());
            offer.approve_correction.apply(correction::check_approve(
                ctx.config,
                offer.plan.as_ref(),
                &self.recommended_approve,
            ));

            offer.recommended_buyout = Some(self.recommended_buyout.clone());
            offer.buyout_correction.apply(correction::check_buyout(
                ctx.config,
                offer.plan.as_ref(),
                &self.recommended_buyout,
            ));

            offer.recommended_confirmation_price =
                Some(self.recommended_confirmation_price.clone());
            offer
                .confirmation_price_correction
                .apply(correction::check_confirmation_price(
                    ctx.config,
                    offer.plan.as_ref(),
                    self.max_confirmation_price,
                ));
        }

        // 9. Affiliates last; they get no plan comparisons.
        for affiliate in self.affiliates.values_mut() {
            affiliate.finalize_stats(ctx);
        }
    }

    /// Project a plausible approve percentage from the efficiency shortfall,
    /// damped by the blend factor, then clamp to
    /// [fact, fact + clamp width] — never recommend a value implying a large
    /// unexplained jump from reality.
    fn compute_recommended_approve(&mut self, ctx: &FinalizeContext<'_>) -> Recommendation {
        let approved = self.lead_container.leads_approved_count as f64;
        let non_trash = self.lead_container.leads_non_trash_count as f64;

        let expected = match self.expecting_approve_leads {
            Some(v) if v > 0.0 => v,
            _ => return Recommendation::none("Expected approve projection unavailable"),
        };
        self.approve_rate_plan = Some(safe_div(expected, non_trash));

        let effective_percent = match self.stat.effective_percent {
            Some(v) if v > 0.0 => v,
            _ => {
                return Recommendation::none(
                    "Category efficiency percentage unavailable, cannot project approvals",
                )
            }
        };

        let plausible_approved = (approved / (effective_percent / 100.0) - approved)
            * ctx.config.approve_blend_factor
            + approved;
        let mut value = safe_percent(plausible_approved, non_trash);
        let mut comment = format!(
            "Current efficiency: {effective_percent}, projected approve count: {plausible_approved}"
        );

        let fact = self.approve_percent_fact.unwrap_or(0.0);
        let ceiling = fact + ctx.config.approve_clamp_width;
        if value < fact {
            comment += &format!(
                "\nObserved approve ({fact}) exceeds the recommended ({value}); raising the recommendation to the observed value"
            );
            value = fact;
        } else if value > ceiling {
            comment += &format!(
                "\nRecommended approve ({value}) exceeds observed ({fact}) by more than +{}; capping at the upper bound",
                ctx.config.approve_clamp_width,
            );
            value = ceiling;
        }

        Recommendation::new(value, comment)
    }
}

/// Sum an optional contribution into an optional total; any `None`
/// contribution poisons the total for the rest of the run.
fn accumulate(total: &mut Option<f64>, contribution: Option<f64>) {
    match (total.as_mut(), contribution) {
        (Some(t), Some(c)) => *t += c,
        _ => *total = None,
    }
}
