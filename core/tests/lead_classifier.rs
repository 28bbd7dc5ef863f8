//! Lead outcome classification rules.

use kpi_core::config::ClassifierConfig;
use kpi_core::lead_classifier::LeadClassifier;

fn classifier() -> LeadClassifier {
    LeadClassifier::new(ClassifierConfig::default())
}

#[test]
fn approval_in_payable_group_with_date_is_genuine() {
    let verdict = classifier().is_fake_approval(
        "Confirmed",
        "accepted",
        Some("2026-05-10 12:00:00"),
        None,
    );
    assert!(verdict.is_none(), "expected genuine approval, got {verdict:?}");
}

#[test]
fn approval_outside_payable_groups_is_fake() {
    let verdict =
        classifier().is_fake_approval("Confirmed", "cancel", Some("2026-05-10 12:00:00"), None);
    assert_eq!(verdict.as_deref(), Some("Status group: cancel"));
}

#[test]
fn send_later_marker_beats_everything_else() {
    // Healthy group and dates, but the order is parked.
    let verdict = classifier().is_fake_approval(
        "Send LATER until June",
        "accepted",
        Some("2026-05-10 12:00:00"),
        None,
    );
    assert!(verdict.is_some(), "send-later order must not be credited");
}

#[test]
fn cancellation_at_or_after_approval_invalidates_it() {
    let c = classifier();

    let after = c.is_fake_approval(
        "Confirmed",
        "accepted",
        Some("2026-05-10 12:00:00"),
        Some("2026-05-11 08:00:00"),
    );
    assert!(after.is_some(), "cancel after approval must be fake");

    let same = c.is_fake_approval(
        "Confirmed",
        "accepted",
        Some("2026-05-10 12:00:00"),
        Some("2026-05-10 12:00:00"),
    );
    assert!(same.is_some(), "cancel at the approval instant must be fake");

    let before = c.is_fake_approval(
        "Confirmed",
        "accepted",
        Some("2026-05-10 12:00:00"),
        Some("2026-05-09 12:00:00"),
    );
    assert!(
        before.is_none(),
        "a cancellation before the approval belongs to an earlier attempt"
    );
}

#[test]
fn missing_or_empty_approval_date_is_fake() {
    let c = classifier();
    assert!(c.is_fake_approval("Confirmed", "accepted", None, None).is_some());
    assert!(c.is_fake_approval("Confirmed", "accepted", Some(""), None).is_some());
}

#[test]
fn bad_status_substring_is_fake_case_insensitive() {
    let verdict = classifier().is_fake_approval(
        "CALLBACK scheduled",
        "accepted",
        Some("2026-05-10 12:00:00"),
        None,
    );
    assert_eq!(verdict.as_deref(), Some("Order is in status: CALLBACK scheduled"));
}

#[test]
fn buyout_requires_paid_group_and_date() {
    let c = classifier();
    assert!(c.is_fake_buyout("paid", Some("2026-05-20 15:00:00")).is_none());
    assert!(c.is_fake_buyout("accepted", Some("2026-05-20 15:00:00")).is_some());
    assert!(c.is_fake_buyout("paid", None).is_some());
    assert!(c.is_fake_buyout("paid", Some("")).is_some());
}

#[test]
fn processing_group_is_recognized() {
    let c = classifier();
    assert!(c.is_processing("processing"));
    assert!(!c.is_processing("accepted"));
}

#[test]
fn trash_heuristic_matches_group_and_verbose() {
    let c = classifier();
    assert!(c.is_trash_status("trash", "anything"));
    assert!(c.is_trash_status("cancel", "Duplicate order"));
    assert!(!c.is_trash_status("accepted", "Confirmed"));
}

#[test]
fn localized_taxonomy_can_replace_the_defaults() {
    let config = ClassifierConfig {
        good_approve_status_groups: vec!["ok".to_string()],
        bad_approve_substrings: vec!["postponed".to_string()],
        ..ClassifierConfig::default()
    };
    let c = LeadClassifier::new(config);

    assert!(
        c.is_fake_approval("Confirmed", "accepted", Some("2026-05-10"), None)
            .is_some(),
        "default group must no longer be payable"
    );
    assert!(c
        .is_fake_approval("Confirmed", "ok", Some("2026-05-10"), None)
        .is_none());
    assert!(c
        .is_fake_approval("Postponed delivery", "ok", Some("2026-05-10"), None)
        .is_some());
}
