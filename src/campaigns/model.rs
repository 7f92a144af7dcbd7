//! Campaign model and status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a campaign. Strictly monotonic: Draft → Queued → Dispatching
/// → Completed, no backward transitions and no skipping Dispatching once a
/// send has been attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Authored but not yet released for sending.
    Draft,
    /// Released; the dispatcher will pick it up on its next cycle.
    Queued,
    /// At least one send has been attempted; more targets may remain.
    Dispatching,
    /// Every resolved target has been sent to.
    Completed,
}

impl CampaignStatus {
    /// Check if this status allows transitioning to another.
    pub fn can_transition_to(&self, target: CampaignStatus) -> bool {
        use CampaignStatus::*;

        matches!(
            (self, target),
            (Draft, Queued) | (Queued, Dispatching) | (Queued, Completed) | (Dispatching, Completed)
        )
    }

    /// Whether the dispatcher should still consider this campaign.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Queued | Self::Dispatching)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Queued => "queued",
            Self::Dispatching => "dispatching",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Segment selector: minimum engagement points, an optional tag, and an
/// optional cap on the number of targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentFilter {
    pub min_points: u32,
    pub tag: Option<String>,
    pub limit: Option<u32>,
}

/// Operator input for creating a campaign.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignSpec {
    /// Outbound message template; may contain a `{{name}}` placeholder.
    pub message: String,
    #[serde(default)]
    pub filter: SegmentFilter,
    /// Single-contact target that bypasses the segment filter.
    #[serde(default)]
    pub direct_target: Option<String>,
}

/// A bulk outbound message job.
///
/// `sent_to` is the dedup set: the durable record of contacts already
/// committed for this campaign. It only grows, and a contact id appears in
/// it at most once.
#[derive(Debug, Clone, Serialize)]
pub struct Campaign {
    pub id: Uuid,
    pub message: String,
    pub filter: SegmentFilter,
    pub direct_target: Option<String>,
    pub status: CampaignStatus,
    pub sent_to: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn from_spec(spec: CampaignSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: spec.message,
            filter: spec.filter,
            direct_target: spec.direct_target,
            status: CampaignStatus::Queued,
            sent_to: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn was_sent_to(&self, contact_id: &str) -> bool {
        self.sent_to.iter().any(|id| id == contact_id)
    }
}

/// Render a campaign message for one recipient: substitute `{{name}}` with
/// the contact's first display-name token, falling back to a generic term
/// so a literal placeholder never reaches the channel.
pub fn render_message(template: &str, display_name: &str) -> String {
    let name = display_name.split_whitespace().next().unwrap_or("cliente");
    template.replace("{{name}}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_valid() {
        assert!(CampaignStatus::Draft.can_transition_to(CampaignStatus::Queued));
        assert!(CampaignStatus::Queued.can_transition_to(CampaignStatus::Dispatching));
        assert!(CampaignStatus::Queued.can_transition_to(CampaignStatus::Completed));
        assert!(CampaignStatus::Dispatching.can_transition_to(CampaignStatus::Completed));
    }

    #[test]
    fn status_transitions_invalid() {
        assert!(!CampaignStatus::Completed.can_transition_to(CampaignStatus::Dispatching));
        assert!(!CampaignStatus::Completed.can_transition_to(CampaignStatus::Queued));
        assert!(!CampaignStatus::Dispatching.can_transition_to(CampaignStatus::Queued));
        assert!(!CampaignStatus::Dispatching.can_transition_to(CampaignStatus::Draft));
        assert!(!CampaignStatus::Draft.can_transition_to(CampaignStatus::Dispatching));
    }

    #[test]
    fn ready_statuses() {
        assert!(CampaignStatus::Queued.is_ready());
        assert!(CampaignStatus::Dispatching.is_ready());
        assert!(!CampaignStatus::Draft.is_ready());
        assert!(!CampaignStatus::Completed.is_ready());
    }

    #[test]
    fn status_serde_roundtrip() {
        let json = serde_json::to_string(&CampaignStatus::Dispatching).unwrap();
        assert_eq!(json, "\"dispatching\"");
        let parsed: CampaignStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, CampaignStatus::Dispatching);
    }

    #[test]
    fn render_substitutes_first_name_token() {
        assert_eq!(render_message("Oi {{name}}!", "Maria Silva"), "Oi Maria!");
    }

    #[test]
    fn render_falls_back_for_empty_name() {
        let rendered = render_message("Oi {{name}}!", "");
        assert_eq!(rendered, "Oi cliente!");
        assert!(!rendered.contains("{{name}}"));
    }

    #[test]
    fn render_without_placeholder_is_identity() {
        assert_eq!(render_message("Promo do dia!", "Maria"), "Promo do dia!");
    }

    #[test]
    fn render_replaces_every_occurrence() {
        assert_eq!(
            render_message("{{name}}, {{name}}!", "Maria Silva"),
            "Maria, Maria!"
        );
    }

    #[test]
    fn from_spec_starts_queued_and_unsent() {
        let campaign = Campaign::from_spec(CampaignSpec {
            message: "Oi {{name}}".into(),
            filter: SegmentFilter::default(),
            direct_target: None,
        });
        assert_eq!(campaign.status, CampaignStatus::Queued);
        assert!(campaign.sent_to.is_empty());
    }
}
