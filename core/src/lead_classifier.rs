//! Pure classification rules for lead approval/buyout events.
//!
//! A `None` verdict means the event is genuine; `Some(reason)` means it is
//! fake and must not be credited, with a human-readable reason for the
//! report. The rules run in a fixed order and the first match wins.

use crate::config::ClassifierConfig;

pub struct LeadClassifier {
    config: ClassifierConfig,
}

impl LeadClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Decide whether an approval event is fake.
    ///
    /// Rule order (first match wins):
    ///   1. status group outside the payable set
    ///   2. "send later" marker in the verbose status
    ///   3. cancellation at or after the approval
    ///   4. missing approval date
    ///   5. bad-status substring in the verbose status
    pub fn is_fake_approval(
        &self,
        status_verbose: &str,
        status_group: &str,
        approved_at: Option<&str>,
        canceled_at: Option<&str>,
    ) -> Option<String> {
        if !self
            .config
            .good_approve_status_groups
            .iter()
            .any(|g| g == status_group)
        {
            return Some(format!("Status group: {status_group}"));
        }

        let verbose_lower = status_verbose.to_lowercase();
        if verbose_lower.contains(&self.config.send_later_marker) {
            return Some(format!(
                "Order is in '{}' status",
                self.config.send_later_marker
            ));
        }

        let approved_at = present(approved_at);
        let canceled_at = present(canceled_at);

        // ISO-8601 strings, so lexicographic order is chronological order.
        if let (Some(approved), Some(canceled)) = (approved_at, canceled_at) {
            if canceled >= approved {
                return Some(format!(
                    "Order canceled ({canceled}) at or after approval ({approved})"
                ));
            }
        }

        if approved_at.is_none() {
            return Some("Missing approval date".to_string());
        }

        for bad in &self.config.bad_approve_substrings {
            if verbose_lower.contains(bad.as_str()) {
                return Some(format!("Order is in status: {status_verbose}"));
            }
        }

        None
    }

    /// A buyout is genuine only for a paid lead with a buyout date.
    pub fn is_fake_buyout(&self, status_group: &str, buyout_at: Option<&str>) -> Option<String> {
        if status_group != self.config.paid_status_group {
            return Some(format!(
                "Lead is not in the '{}' status group",
                self.config.paid_status_group
            ));
        }
        if present(buyout_at).is_none() {
            return Some("Missing buyout date".to_string());
        }
        None
    }

    pub fn is_processing(&self, status_group: &str) -> bool {
        status_group == self.config.processing_status_group
    }

    /// Trash heuristic applied on top of the source's explicit trash flag.
    pub fn is_trash_status(&self, status_group: &str, status_verbose: &str) -> bool {
        let group_lower = status_group.to_lowercase();
        let verbose_lower = status_verbose.to_lowercase();
        self.config
            .trash_substrings
            .iter()
            .any(|t| group_lower.contains(t.as_str()) || verbose_lower.contains(t.as_str()))
    }
}

/// Treat empty timestamps the same as absent ones.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
