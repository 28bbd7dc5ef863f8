//! Category-level finalize: projections, recommendations, corrections.

use chrono::NaiveDate;
use kpi_core::analyzer::FinalizeContext;
use kpi_core::call_aggregator::Call;
use kpi_core::config::AnalyzerConfig;
use kpi_core::hierarchy::CategoryItem;
use kpi_core::kpi_plan::KpiPlanIndex;
use kpi_core::lead_aggregator::Lead;
use kpi_core::lead_container::LeadContainerEntry;
use kpi_core::rows::{CallRow, KpiPlanRow, LeadContainerRow, LeadRow};

fn plan_row(offer_id: i64, efficiency: f64, approve: f64, buyout: f64, price: f64) -> KpiPlanRow {
    KpiPlanRow {
        id: offer_id,
        offer_id,
        affiliate_id: None,
        period_date: "2026-01-01".to_string(),
        operator_efficiency: Some(efficiency),
        planned_approve: Some(approve),
        planned_buyout: Some(buyout),
        confirmation_price: Some(price),
        updated_at: None,
        operator_efficiency_updated_at: None,
        planned_approve_updated_at: None,
        planned_buyout_updated_at: None,
        confirmation_price_updated_at: None,
    }
}

fn push_effective_calls(category: &mut CategoryItem, count: i64, offer_id: i64) {
    for lead_id in 1..=count {
        let row = CallRow {
            id: lead_id,
            uniqueid: format!("u{lead_id}"),
            offer_id,
            affiliate_id: 1,
            operator_id: 10,
            operator_name: "alice".to_string(),
            lead_id,
            call_date: "2026-05-10 10:15:00".to_string(),
            billsec: Some(90),
            billsec_exact: None,
            category_name: "Health".to_string(),
        };
        category.push_call(Call::from_row(&row).unwrap());
    }
}

fn push_payable_leads(category: &mut CategoryItem, count: i64, offer_id: i64) {
    for lead_id in 1..=count {
        category.push_lead(Lead::from_row(&LeadRow {
            lead_id,
            approved_at: Some("2026-05-10 12:00:00".to_string()),
            canceled_at: None,
            status_verbose: "Confirmed".to_string(),
            status_group: "accepted".to_string(),
            operator_name: "alice".to_string(),
            offer_id,
            affiliate_id: 1,
            category_name: "Health".to_string(),
        }));
    }
}

/// 20 container leads on one offer: 3 bought out, 6 more approved,
/// 9 worked but unapproved, 2 trash.
fn push_containers(category: &mut CategoryItem, offer_id: i64) {
    for lead_id in 1..=20i64 {
        let (group, verbose) = match lead_id {
            1..=3 => ("paid", "Paid"),
            4..=9 => ("accepted", "Confirmed"),
            10..=18 => ("cancel", "Canceled by client"),
            _ => ("cancel", "Canceled by client"),
        };
        category.push_lead_container(LeadContainerEntry::from_row(&LeadContainerRow {
            lead_id,
            created_at: Some("2026-05-01 09:00:00".to_string()),
            approved_at: (lead_id <= 9).then(|| "2026-05-10 12:00:00".to_string()),
            canceled_at: None,
            buyout_at: (lead_id <= 3).then(|| "2026-05-20 15:00:00".to_string()),
            status_verbose: verbose.to_string(),
            status_group: group.to_string(),
            is_trash: lead_id > 18,
            offer_id,
            affiliate_id: 1,
            category_name: "Health".to_string(),
        }));
    }
}

fn config() -> AnalyzerConfig {
    AnalyzerConfig {
        plan_as_of: NaiveDate::from_ymd_opt(2026, 6, 1),
        ..AnalyzerConfig::default()
    }
}

fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

#[test]
fn plan_driven_expectations_and_facts() {
    let cfg = config();
    let classifier = kpi_core::lead_classifier::LeadClassifier::new(cfg.classifier.clone());
    let plans = KpiPlanIndex::from_rows([plan_row(7, 0.5, 50.0, 30.0, 10.0)], 0.1).unwrap();
    let ctx = FinalizeContext {
        config: &cfg,
        classifier: &classifier,
        plans: &plans,
        plan_as_of: cfg.plan_as_of_date(),
    };

    let mut category = CategoryItem::new("Health");
    push_effective_calls(&mut category, 10, 7);
    push_payable_leads(&mut category, 8, 7);
    push_containers(&mut category, 7);
    category.finalize(&ctx);

    assert_eq!(category.lead_container.leads_non_trash_count, 18);
    assert_eq!(category.lead_container.leads_approved_count, 9);
    assert_eq!(category.lead_container.leads_buyout_count, 3);
    assert_eq!(category.approve_percent_fact, Some(50.0), "9 of 18 non-trash");
    assert!(approx(category.buyout_percent_fact.unwrap(), 100.0 / 3.0));

    // 18 non-trash * 50% planned approve, 9 approved * 30% planned buyout.
    assert_eq!(category.expecting_approve_leads, Some(9.0));
    assert!(approx(category.expecting_buyout_leads.unwrap(), 2.7));

    // 10 effective calls vs 8 payable leads against 20 expected.
    assert_eq!(category.stat.calls_effective_count, 10);
    assert_eq!(category.stat.leads_effective_count, 8);
    assert_eq!(category.stat.effective_percent, Some(40.0));
}

#[test]
fn recommended_approve_is_capped_above_the_observed_fact() {
    let cfg = config();
    let classifier = kpi_core::lead_classifier::LeadClassifier::new(cfg.classifier.clone());
    let plans = KpiPlanIndex::from_rows([plan_row(7, 0.5, 50.0, 30.0, 10.0)], 0.1).unwrap();
    let ctx = FinalizeContext {
        config: &cfg,
        classifier: &classifier,
        plans: &plans,
        plan_as_of: cfg.plan_as_of_date(),
    };

    let mut category = CategoryItem::new("Health");
    push_effective_calls(&mut category, 10, 7);
    push_payable_leads(&mut category, 8, 7);
    push_containers(&mut category, 7);
    category.finalize(&ctx);

    // The raw projection (72.5%) exceeds fact (50%) by more than 5 points.
    assert_eq!(category.recommended_approve.value, Some(55.0));
    assert!(
        category.recommended_approve.comment.contains("capping"),
        "got: {}",
        category.recommended_approve.comment
    );
}

#[test]
fn recommended_approve_never_drops_below_the_observed_fact() {
    let cfg = config();
    let classifier = kpi_core::lead_classifier::LeadClassifier::new(cfg.classifier.clone());
    let plans = KpiPlanIndex::from_rows([plan_row(7, 0.5, 50.0, 30.0, 10.0)], 0.1).unwrap();
    let ctx = FinalizeContext {
        config: &cfg,
        classifier: &classifier,
        plans: &plans,
        plan_as_of: cfg.plan_as_of_date(),
    };

    // Only 3 effective calls: 6 expected leads against 8 payable ones puts
    // the efficiency percentage above 100 and the raw projection (46.25%)
    // below the observed approve fact (50%).
    let mut category = CategoryItem::new("Health");
    push_effective_calls(&mut category, 3, 7);
    push_payable_leads(&mut category, 8, 7);
    push_containers(&mut category, 7);
    category.finalize(&ctx);

    assert_eq!(category.recommended_approve.value, Some(50.0));
    assert!(
        category.recommended_approve.comment.contains("raising"),
        "got: {}",
        category.recommended_approve.comment
    );
}

#[test]
fn buyout_and_price_recommendations() {
    let cfg = config();
    let classifier = kpi_core::lead_classifier::LeadClassifier::new(cfg.classifier.clone());
    let plans = KpiPlanIndex::from_rows(
        [
            plan_row(7, 0.5, 50.0, 30.0, 10.0),
            plan_row(8, 0.5, 50.0, 30.0, 14.5),
        ],
        0.1,
    )
    .unwrap();
    let ctx = FinalizeContext {
        config: &cfg,
        classifier: &classifier,
        plans: &plans,
        plan_as_of: cfg.plan_as_of_date(),
    };

    let mut category = CategoryItem::new("Health");
    category.register_offer(8, "Offer #8");
    push_effective_calls(&mut category, 10, 7);
    push_payable_leads(&mut category, 8, 7);
    push_containers(&mut category, 7);
    category.finalize(&ctx);

    // Buyout: observed 33.33% nudged up 2%.
    assert!(approx(category.recommended_buyout.value.unwrap(), 34.0));

    // Price: the maximum across the category's offer plans.
    assert_eq!(category.max_confirmation_price, 14.5);
    assert_eq!(category.recommended_confirmation_price.value, Some(14.5));

    // Offer 7 carries a lower price and must be flagged; offer 8 matches.
    let offer7 = &category.offers[&7];
    let offer8 = &category.offers[&8];
    assert!(offer7.confirmation_price_correction.flagged);
    assert!(!offer8.confirmation_price_correction.flagged);
}

#[test]
fn category_recommendations_push_down_to_offers() {
    let cfg = config();
    let classifier = kpi_core::lead_classifier::LeadClassifier::new(cfg.classifier.clone());
    let plans = KpiPlanIndex::from_rows([plan_row(7, 0.5, 50.0, 30.0, 10.0)], 0.1).unwrap();
    let ctx = FinalizeContext {
        config: &cfg,
        classifier: &classifier,
        plans: &plans,
        plan_as_of: cfg.plan_as_of_date(),
    };

    let mut category = CategoryItem::new("Health");
    push_effective_calls(&mut category, 10, 7);
    push_payable_leads(&mut category, 8, 7);
    push_containers(&mut category, 7);
    category.finalize(&ctx);

    let offer = &category.offers[&7];
    assert_eq!(
        offer.recommended_approve.as_ref().and_then(|r| r.value),
        category.recommended_approve.value
    );
    assert_eq!(
        offer.recommended_buyout.as_ref().and_then(|r| r.value),
        category.recommended_buyout.value
    );

    // Planned approve 50 vs recommended 55 exceeds the 1pp tolerance.
    assert!(offer.approve_correction.flagged);
    // No operator pool this small run, so no efficiency recommendation.
    assert!(offer.efficiency_correction.flagged);
    assert_eq!(offer.efficiency_correction.reason, "No recommendation could be computed");
}

#[test]
fn offer_without_a_plan_poisons_the_category_projection() {
    let cfg = config();
    let classifier = kpi_core::lead_classifier::LeadClassifier::new(cfg.classifier.clone());
    let plans = KpiPlanIndex::from_rows([plan_row(7, 0.5, 50.0, 30.0, 10.0)], 0.1).unwrap();
    let ctx = FinalizeContext {
        config: &cfg,
        classifier: &classifier,
        plans: &plans,
        plan_as_of: cfg.plan_as_of_date(),
    };

    let mut category = CategoryItem::new("Health");
    category.register_offer(9, "Offer #9"); // catalog entry, no plan
    push_effective_calls(&mut category, 10, 7);
    push_payable_leads(&mut category, 8, 7);
    push_containers(&mut category, 7);
    category.finalize(&ctx);

    assert_eq!(category.expecting_approve_leads, None);
    assert_eq!(category.expecting_buyout_leads, None);
    assert!(category.recommended_approve.value.is_none());

    let orphan = &category.offers[&9];
    assert!(orphan.efficiency_correction.flagged);
    assert_eq!(orphan.efficiency_correction.reason, "KPI plan not found");
}

#[test]
fn affiliates_get_stats_but_no_plan_checks() {
    let cfg = config();
    let classifier = kpi_core::lead_classifier::LeadClassifier::new(cfg.classifier.clone());
    let plans = KpiPlanIndex::from_rows([plan_row(7, 0.5, 50.0, 30.0, 10.0)], 0.1).unwrap();
    let ctx = FinalizeContext {
        config: &cfg,
        classifier: &classifier,
        plans: &plans,
        plan_as_of: cfg.plan_as_of_date(),
    };

    let mut category = CategoryItem::new("Health");
    push_effective_calls(&mut category, 10, 7);
    push_payable_leads(&mut category, 8, 7);
    category.finalize(&ctx);

    let affiliate = &category.affiliates[&1];
    assert!(affiliate.stat.is_finalized());
    assert_eq!(affiliate.stat.calls_effective_count, 10);
    assert!(affiliate.plan.is_none());
    assert!(!affiliate.efficiency_correction.flagged);
}

#[test]
fn finalize_is_idempotent() {
    let cfg = config();
    let classifier = kpi_core::lead_classifier::LeadClassifier::new(cfg.classifier.clone());
    let plans = KpiPlanIndex::from_rows([plan_row(7, 0.5, 50.0, 30.0, 10.0)], 0.1).unwrap();
    let ctx = FinalizeContext {
        config: &cfg,
        classifier: &classifier,
        plans: &plans,
        plan_as_of: cfg.plan_as_of_date(),
    };

    let mut category = CategoryItem::new("Health");
    push_effective_calls(&mut category, 10, 7);
    push_payable_leads(&mut category, 8, 7);
    push_containers(&mut category, 7);
    category.finalize(&ctx);

    let approve = category.recommended_approve.value;
    let expected = category.expecting_approve_leads;

    category.finalize(&ctx);
    assert_eq!(category.recommended_approve.value, approve);
    assert_eq!(category.expecting_approve_leads, expected);
    assert_eq!(category.lead_container.leads_approved_count, 9);
}
