//! Campaign store — validated creation, ready-scan, and the two durable
//! operations the dispatcher's correctness rests on: `record_send` (the
//! idempotency boundary) and `transition` (monotonic status).

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::campaigns::model::{Campaign, CampaignSpec, CampaignStatus};
use crate::error::{CampaignError, Result};
use crate::store::Store;

pub struct CampaignStore {
    store: Arc<dyn Store>,
}

impl CampaignStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Validate and persist a new campaign with `status = Queued` and an
    /// empty dedup set. Malformed specs never reach the dispatcher.
    pub async fn create(&self, spec: CampaignSpec) -> Result<Campaign> {
        if spec.message.trim().is_empty() {
            return Err(CampaignError::InvalidSpec {
                reason: "message must not be empty".into(),
            }
            .into());
        }
        if let Some(target) = &spec.direct_target
            && target.trim().is_empty()
        {
            return Err(CampaignError::InvalidSpec {
                reason: "direct target must not be empty".into(),
            }
            .into());
        }
        if spec.filter.limit == Some(0) {
            return Err(CampaignError::InvalidSpec {
                reason: "limit must be at least 1 when set".into(),
            }
            .into());
        }

        let campaign = Campaign::from_spec(spec);
        self.store.insert_campaign(&campaign).await?;
        info!(campaign_id = %campaign.id, "Campaign created");
        Ok(campaign)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Campaign>> {
        Ok(self.store.get_campaign(id).await?)
    }

    /// Campaigns eligible for processing: Queued or Dispatching, in
    /// creation order. Dispatching campaigns stay eligible so a restart
    /// resumes them.
    pub async fn list_ready(&self) -> Result<Vec<Campaign>> {
        Ok(self.store.list_ready_campaigns().await?)
    }

    /// Durably add a contact to the campaign's `sent_to` set. Safe to call
    /// twice with the same arguments; the second call is a no-op.
    pub async fn record_send(&self, id: Uuid, contact_id: &str) -> Result<bool> {
        Ok(self.store.record_send(id, contact_id).await?)
    }

    /// Transition a campaign's status, enforcing the monotonic order.
    ///
    /// The store applies the change with a compare-and-swap on the current
    /// status, so a concurrent writer cannot sneak in a regression between
    /// our read and our write.
    pub async fn transition(&self, id: Uuid, to: CampaignStatus) -> Result<()> {
        let campaign = self
            .store
            .get_campaign(id)
            .await?
            .ok_or(CampaignError::NotFound { id })?;

        let from = campaign.status;
        if !from.can_transition_to(to) {
            return Err(CampaignError::InvalidTransition { id, from, to }.into());
        }

        if !self.store.cas_campaign_status(id, from, to).await? {
            // Another writer moved the status first.
            return Err(CampaignError::InvalidTransition { id, from, to }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaigns::model::SegmentFilter;
    use crate::error::Error;
    use crate::store::LibSqlStore;

    async fn campaign_store() -> CampaignStore {
        let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        CampaignStore::new(store)
    }

    fn spec(message: &str) -> CampaignSpec {
        CampaignSpec {
            message: message.into(),
            filter: SegmentFilter::default(),
            direct_target: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_empty_message() {
        let campaigns = campaign_store().await;
        let err = campaigns.create(spec("   ")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Campaign(CampaignError::InvalidSpec { .. })
        ));
    }

    #[tokio::test]
    async fn create_rejects_zero_limit() {
        let campaigns = campaign_store().await;
        let mut s = spec("oi");
        s.filter.limit = Some(0);
        let err = campaigns.create(s).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Campaign(CampaignError::InvalidSpec { .. })
        ));
    }

    #[tokio::test]
    async fn create_rejects_blank_direct_target() {
        let campaigns = campaign_store().await;
        let mut s = spec("oi");
        s.direct_target = Some("  ".into());
        let err = campaigns.create(s).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Campaign(CampaignError::InvalidSpec { .. })
        ));
    }

    #[tokio::test]
    async fn transitions_are_monotonic() {
        let campaigns = campaign_store().await;
        let campaign = campaigns.create(spec("oi")).await.unwrap();

        campaigns
            .transition(campaign.id, CampaignStatus::Dispatching)
            .await
            .unwrap();
        campaigns
            .transition(campaign.id, CampaignStatus::Completed)
            .await
            .unwrap();

        // No regression from a terminal status.
        let err = campaigns
            .transition(campaign.id, CampaignStatus::Dispatching)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Campaign(CampaignError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn transition_unknown_campaign_is_not_found() {
        let campaigns = campaign_store().await;
        let err = campaigns
            .transition(Uuid::new_v4(), CampaignStatus::Dispatching)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Campaign(CampaignError::NotFound { .. })
        ));
    }
}
