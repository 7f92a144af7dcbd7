//! `Store` trait — single async interface over the persisted collections.
//!
//! Three independently-keyed record sets: contacts, campaigns (with their
//! dedup set), and orders. Every write is a bounded read-modify-write
//! executed atomically by the backend; no operation holds a lock across an
//! await point outside the backend itself.

use async_trait::async_trait;
use uuid::Uuid;

use crate::campaigns::model::{Campaign, CampaignStatus};
use crate::contacts::Contact;
use crate::error::StorageError;
use crate::orders::Order;

#[async_trait]
pub trait Store: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), StorageError>;

    // ── Contacts ────────────────────────────────────────────────────

    /// Create the contact on first sight, or refresh it on a repeat
    /// message: update `last_contact_at`, append `message_text` to the
    /// history excerpt (pruned to `history_limit`), and overwrite the
    /// display name only when `display_name_hint` is non-empty.
    /// Returns the post-update snapshot.
    async fn upsert_contact(
        &self,
        id: &str,
        display_name_hint: &str,
        message_text: &str,
        history_limit: usize,
    ) -> Result<Contact, StorageError>;

    /// Look up a contact by recipient id.
    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, StorageError>;

    /// Overwrite a contact's engagement attributes.
    async fn set_engagement(
        &self,
        id: &str,
        points: u32,
        tags: &[String],
    ) -> Result<(), StorageError>;

    /// Contacts with `points >= min_points` and, when `tag` is given, that
    /// tag present — in directory insertion order, truncated to `limit`.
    async fn query_contacts(
        &self,
        min_points: u32,
        tag: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Contact>, StorageError>;

    // ── Campaigns ───────────────────────────────────────────────────

    /// Persist a new campaign.
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StorageError>;

    /// Get a campaign, including its `sent_to` set.
    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, StorageError>;

    /// Campaigns with status Queued or Dispatching, in creation order.
    /// Both are eligible so a crash mid-dispatch resumes on restart.
    async fn list_ready_campaigns(&self) -> Result<Vec<Campaign>, StorageError>;

    /// Durably add `contact_id` to the campaign's `sent_to` set.
    /// Idempotent: returns `true` when the entry is new, `false` when the
    /// contact was already recorded.
    async fn record_send(
        &self,
        campaign_id: Uuid,
        contact_id: &str,
    ) -> Result<bool, StorageError>;

    /// Compare-and-swap the campaign status. Returns `false` when the
    /// stored status no longer equals `from` (another writer won).
    async fn cas_campaign_status(
        &self,
        id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<bool, StorageError>;

    // ── Orders ──────────────────────────────────────────────────────

    /// Append an order.
    async fn insert_order(&self, order: &Order) -> Result<(), StorageError>;

    /// All orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>, StorageError>;
}
