//! Operator ranking and efficiency recommendation.

use kpi_core::config::AnalyzerConfig;
use kpi_core::hierarchy::CommonItem;
use kpi_core::recommendation::{RecommendationEngine, TopOperators};

fn operator(name: &str, effective_calls: u64, payable_leads: u64) -> CommonItem {
    let mut item = CommonItem::new(name, name);
    item.stat.calls_effective_count = effective_calls;
    item.stat.leads_effective_count = payable_leads;
    item.stat.effective_rate = if payable_leads == 0 {
        0.0
    } else {
        effective_calls as f64 / payable_leads as f64
    };
    item
}

fn engine() -> RecommendationEngine {
    RecommendationEngine::new(&AnalyzerConfig::default())
}

#[test]
fn qualified_operators_sort_ascending_by_rate() {
    let ops = vec![
        operator("slow", 90, 10),   // 9.0 calls per lead
        operator("fast", 40, 20),   // 2.0
        operator("mid", 60, 12),    // 5.0
        operator("tiny", 5, 4),     // under the volume threshold
        operator("idle", 50, 0),    // zero rate never qualifies
    ];

    let sorted = engine().sort_operators_by_efficiency(ops.iter());
    let keys: Vec<&str> = sorted.iter().map(|op| op.key.as_str()).collect();
    assert_eq!(keys[..3], ["fast", "mid", "slow"], "lower rate ranks higher");
    assert!(keys[3..].contains(&"tiny") && keys[3..].contains(&"idle"));
}

#[test]
fn too_few_qualified_operators_yields_no_pool() {
    // 6 qualified -> round(6 * 0.4) = 2, below the minimum of 3.
    let ops: Vec<CommonItem> = (0..6)
        .map(|i| operator(&format!("op{i}"), 40 + i, 10))
        .collect();

    let top = engine().select_top_operators(&engine().sort_operators_by_efficiency(ops.iter()));
    assert!(top.keys.is_none());
    assert!(
        top.comment.contains("Insufficient operators"),
        "got: {}",
        top.comment
    );
}

#[test]
fn pool_size_rounds_and_takes_the_best() {
    // 8 qualified -> round(8 * 0.4) = 3.
    let ops: Vec<CommonItem> = (0..8)
        .map(|i| operator(&format!("op{i}"), 40, 20 - i)) // op0 has the lowest rate
        .collect();

    let sorted = engine().sort_operators_by_efficiency(ops.iter());
    let top = engine().select_top_operators(&sorted);
    assert_eq!(
        top.keys.as_deref(),
        Some(&["op0".to_string(), "op1".to_string(), "op2".to_string()][..])
    );
}

#[test]
fn pool_size_is_capped() {
    // 20 qualified -> round(20 * 0.4) = 8, capped at 5.
    let ops: Vec<CommonItem> = (0..20)
        .map(|i| operator(&format!("op{i:02}"), 40, 30 - i))
        .collect();

    let sorted = engine().sort_operators_by_efficiency(ops.iter());
    let top = engine().select_top_operators(&sorted);
    assert_eq!(top.keys.as_ref().map(Vec::len), Some(5));
}

#[test]
fn recommendation_pools_calls_and_leads_across_the_top() {
    let ops = vec![
        operator("a", 40, 20), // 2.0
        operator("b", 60, 20), // 3.0
        operator("c", 80, 20), // 4.0
        operator("d", 90, 10), // 9.0, qualified but outside the pool
        operator("e", 95, 10),
        operator("f", 99, 10),
        operator("g", 99, 9),
        operator("h", 99, 8),
    ];

    let eng = engine();
    let sorted = eng.sort_operators_by_efficiency(ops.iter());
    let top = eng.select_top_operators(&sorted);
    assert_eq!(top.keys.as_ref().map(Vec::len), Some(3));

    let rec = eng.recommended_efficiency(&sorted, &top);
    // (40 + 60 + 80) / (20 + 20 + 20)
    assert_eq!(rec.value, Some(3.0));
    assert!(rec.comment.contains("Calls: 180"), "got: {}", rec.comment);
}

#[test]
fn no_pool_means_no_recommendation() {
    let ops = vec![operator("a", 40, 20)];
    let eng = engine();
    let sorted = eng.sort_operators_by_efficiency(ops.iter());

    let rec = eng.recommended_efficiency(&sorted, &TopOperators::default());
    assert!(rec.value.is_none());
}

#[test]
fn thin_pooled_volume_withholds_the_recommendation() {
    // A hand-picked pool whose combined volume is under the analysis
    // threshold must not produce a number.
    let ops = vec![operator("a", 10, 5), operator("b", 12, 5)];
    let eng = engine();
    let sorted = eng.sort_operators_by_efficiency(ops.iter());
    let top = TopOperators {
        keys: Some(vec!["a".to_string(), "b".to_string()]),
        comment: String::new(),
    };

    let rec = eng.recommended_efficiency(&sorted, &top);
    assert!(rec.value.is_none());
    assert!(
        rec.comment.contains("Insufficient calls"),
        "got: {}",
        rec.comment
    );
}
