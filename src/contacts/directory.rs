//! Contact directory operations.

use std::sync::Arc;

use tracing::debug;

use crate::contacts::Contact;
use crate::error::{Result, StorageError};
use crate::events::{DomainEvent, EventBus};
use crate::store::Store;

/// Durable contact records plus the `LeadUpdated` fan-out.
///
/// The directory is the only writer of engagement attributes; the campaign
/// dispatcher only ever reads contacts through `query_by_segment`/`get`.
pub struct ContactDirectory {
    store: Arc<dyn Store>,
    bus: EventBus,
    history_limit: usize,
}

impl ContactDirectory {
    pub fn new(store: Arc<dyn Store>, bus: EventBus, history_limit: usize) -> Self {
        Self {
            store,
            bus,
            history_limit,
        }
    }

    /// Create or refresh a contact from an inbound message and publish the
    /// post-update snapshot as `LeadUpdated`.
    ///
    /// A storage failure surfaces to the caller; it is not retried here.
    pub async fn upsert(
        &self,
        id: &str,
        display_name_hint: &str,
        message_text: &str,
    ) -> Result<Contact> {
        let contact = self
            .store
            .upsert_contact(id, display_name_hint, message_text, self.history_limit)
            .await?;

        debug!(contact_id = %contact.id, points = contact.points, "Lead updated");
        self.bus.publish(DomainEvent::LeadUpdated(contact.clone()));
        Ok(contact)
    }

    /// Look up a contact by recipient id.
    pub async fn get(&self, id: &str) -> Result<Option<Contact>> {
        Ok(self.store.get_contact(id).await?)
    }

    /// Overwrite a contact's engagement attributes and publish the new
    /// snapshot.
    pub async fn set_engagement(&self, id: &str, points: u32, tags: &[String]) -> Result<Contact> {
        self.store.set_engagement(id, points, tags).await?;
        let contact = self
            .store
            .get_contact(id)
            .await?
            .ok_or(StorageError::NotFound {
                collection: "contacts".into(),
                id: id.to_string(),
            })?;

        self.bus.publish(DomainEvent::LeadUpdated(contact.clone()));
        Ok(contact)
    }

    /// Resolve a segment: `points >= min_points`, optional tag membership,
    /// directory insertion order, truncated to `limit`.
    pub async fn query_by_segment(
        &self,
        min_points: u32,
        tag: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Contact>> {
        Ok(self.store.query_contacts(min_points, tag, limit).await?)
    }
}
