//! libSQL backend — async `Store` trait implementation.
//!
//! Supports local file and in-memory databases. Every write is a single
//! SQL statement, so the engine's write serialization is what makes each
//! read-modify-write atomic — including when a second process (the
//! management surface) has the same file open.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::campaigns::model::{Campaign, CampaignStatus, SegmentFilter};
use crate::contacts::{Contact, HistoryEntry};
use crate::error::StorageError;
use crate::orders::{Order, OrderStatus};
use crate::store::migrations;
use crate::store::traits::Store;

/// libSQL store backend.
///
/// Holds a single connection reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Open(format!("create database directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Load the `sent_to` set for a campaign, in send order.
    async fn load_sent_to(&self, campaign_id: Uuid) -> Result<Vec<String>, StorageError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT contact_id FROM campaign_sends WHERE campaign_id = ?1 ORDER BY rowid ASC",
                params![campaign_id.to_string()],
            )
            .await
            .map_err(|e| StorageError::Query(format!("load_sent_to: {e}")))?;

        let mut sent_to = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StorageError::Query(format!("load_sent_to: {e}")))?
        {
            sent_to.push(
                row.get::<String>(0)
                    .map_err(|e| StorageError::Query(format!("load_sent_to row: {e}")))?,
            );
        }
        Ok(sent_to)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 datetime string (our canonical write format).
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn status_to_str(status: CampaignStatus) -> &'static str {
    match status {
        CampaignStatus::Draft => "draft",
        CampaignStatus::Queued => "queued",
        CampaignStatus::Dispatching => "dispatching",
        CampaignStatus::Completed => "completed",
    }
}

fn str_to_status(s: &str) -> CampaignStatus {
    match s {
        "draft" => CampaignStatus::Draft,
        "dispatching" => CampaignStatus::Dispatching,
        "completed" => CampaignStatus::Completed,
        _ => CampaignStatus::Queued,
    }
}

/// Convert `Option<&str>` to a libsql value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<u32>` to a libsql value.
fn opt_int(n: Option<u32>) -> libsql::Value {
    match n {
        Some(n) => libsql::Value::Integer(n as i64),
        None => libsql::Value::Null,
    }
}

/// Map a libsql row to a Contact.
///
/// Column order matches CONTACT_COLUMNS:
/// 0:id, 1:display_name, 2:points, 3:tags, 4:last_contact_at, 5:history, 6:created_at
fn row_to_contact(row: &libsql::Row) -> Result<Contact, StorageError> {
    let tags_str: String = row
        .get(3)
        .map_err(|e| StorageError::Query(format!("contact tags: {e}")))?;
    let history_str: String = row
        .get(5)
        .map_err(|e| StorageError::Query(format!("contact history: {e}")))?;
    let last_contact_str: String = row
        .get(4)
        .map_err(|e| StorageError::Query(format!("contact last_contact_at: {e}")))?;
    let created_str: String = row
        .get(6)
        .map_err(|e| StorageError::Query(format!("contact created_at: {e}")))?;

    let tags: Vec<String> = serde_json::from_str(&tags_str)
        .map_err(|e| StorageError::Serialization(format!("contact tags: {e}")))?;
    let history: Vec<HistoryEntry> = serde_json::from_str(&history_str)
        .map_err(|e| StorageError::Serialization(format!("contact history: {e}")))?;

    Ok(Contact {
        id: row
            .get(0)
            .map_err(|e| StorageError::Query(format!("contact id: {e}")))?,
        display_name: row
            .get(1)
            .map_err(|e| StorageError::Query(format!("contact display_name: {e}")))?,
        points: row
            .get::<i64>(2)
            .map_err(|e| StorageError::Query(format!("contact points: {e}")))?
            .max(0) as u32,
        tags,
        last_contact_at: parse_datetime(&last_contact_str),
        history,
        created_at: parse_datetime(&created_str),
    })
}

/// Map a libsql row to a Campaign (without its `sent_to` set).
///
/// Column order matches CAMPAIGN_COLUMNS:
/// 0:id, 1:message, 2:min_points, 3:tag, 4:send_limit, 5:direct_target, 6:status, 7:created_at
fn row_to_campaign(row: &libsql::Row) -> Result<Campaign, StorageError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| StorageError::Query(format!("campaign id: {e}")))?;
    let status_str: String = row
        .get(6)
        .map_err(|e| StorageError::Query(format!("campaign status: {e}")))?;
    let created_str: String = row
        .get(7)
        .map_err(|e| StorageError::Query(format!("campaign created_at: {e}")))?;

    Ok(Campaign {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| StorageError::Serialization(format!("campaign id: {e}")))?,
        message: row
            .get(1)
            .map_err(|e| StorageError::Query(format!("campaign message: {e}")))?,
        filter: SegmentFilter {
            min_points: row
                .get::<i64>(2)
                .map_err(|e| StorageError::Query(format!("campaign min_points: {e}")))?
                .max(0) as u32,
            tag: row.get::<String>(3).ok(),
            limit: row.get::<i64>(4).ok().map(|n| n.max(0) as u32),
        },
        direct_target: row.get::<String>(5).ok(),
        status: str_to_status(&status_str),
        sent_to: Vec::new(),
        created_at: parse_datetime(&created_str),
    })
}

fn row_to_order(row: &libsql::Row) -> Result<Order, StorageError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| StorageError::Query(format!("order id: {e}")))?;
    let created_str: String = row
        .get(4)
        .map_err(|e| StorageError::Query(format!("order created_at: {e}")))?;

    Ok(Order {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| StorageError::Serialization(format!("order id: {e}")))?,
        contact_id: row
            .get(1)
            .map_err(|e| StorageError::Query(format!("order contact_id: {e}")))?,
        text: row
            .get(2)
            .map_err(|e| StorageError::Query(format!("order body: {e}")))?,
        status: OrderStatus::Received,
        created_at: parse_datetime(&created_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const CONTACT_COLUMNS: &str =
    "id, display_name, points, tags, last_contact_at, history, created_at";

const CAMPAIGN_COLUMNS: &str =
    "id, message, min_points, tag, send_limit, direct_target, status, created_at";

#[async_trait]
impl Store for LibSqlStore {
    async fn run_migrations(&self) -> Result<(), StorageError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Contacts ────────────────────────────────────────────────────

    async fn upsert_contact(
        &self,
        id: &str,
        display_name_hint: &str,
        message_text: &str,
        history_limit: usize,
    ) -> Result<Contact, StorageError> {
        let conn = self.conn();
        let now = Utc::now();
        let entry = serde_json::to_string(&HistoryEntry {
            at: now,
            text: message_text.to_string(),
        })
        .map_err(|e| StorageError::Serialization(format!("history entry: {e}")))?;

        // Create-or-refresh in one statement so a concurrent writer can
        // never observe a half-updated row. The display name is only
        // overwritten by a non-empty hint.
        conn.execute(
            "INSERT INTO contacts (id, display_name, points, tags, last_contact_at, history, created_at)
             VALUES (?1, ?2, 0, '[]', ?3, json_array(json(?4)), ?3)
             ON CONFLICT(id) DO UPDATE SET
                 display_name = CASE WHEN ?2 <> '' THEN ?2 ELSE contacts.display_name END,
                 last_contact_at = ?3,
                 history = json_insert(contacts.history, '$[#]', json(?4))",
            params![id, display_name_hint, now.to_rfc3339(), entry],
        )
        .await
        .map_err(|e| StorageError::Query(format!("upsert_contact: {e}")))?;

        // Prune the history excerpt to its bound, keeping the newest
        // entries in chronological order.
        conn.execute(
            "UPDATE contacts SET history = (
                 SELECT json_group_array(json(value)) FROM json_each(contacts.history)
                 WHERE key >= json_array_length(contacts.history) - ?2
             )
             WHERE id = ?1 AND json_array_length(history) > ?2",
            params![id, history_limit as i64],
        )
        .await
        .map_err(|e| StorageError::Query(format!("upsert_contact prune: {e}")))?;

        self.get_contact(id)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                collection: "contacts".into(),
                id: id.to_string(),
            })
    }

    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, StorageError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| StorageError::Query(format!("get_contact: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_contact(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::Query(format!("get_contact: {e}"))),
        }
    }

    async fn set_engagement(
        &self,
        id: &str,
        points: u32,
        tags: &[String],
    ) -> Result<(), StorageError> {
        let tags_json = serde_json::to_string(tags)
            .map_err(|e| StorageError::Serialization(format!("tags: {e}")))?;

        let affected = self
            .conn()
            .execute(
                "UPDATE contacts SET points = ?2, tags = ?3 WHERE id = ?1",
                params![id, points as i64, tags_json],
            )
            .await
            .map_err(|e| StorageError::Query(format!("set_engagement: {e}")))?;

        if affected == 0 {
            return Err(StorageError::NotFound {
                collection: "contacts".into(),
                id: id.to_string(),
            });
        }
        debug!(contact_id = %id, points, "Engagement updated");
        Ok(())
    }

    async fn query_contacts(
        &self,
        min_points: u32,
        tag: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Contact>, StorageError> {
        // rowid preserves directory insertion order; LIMIT -1 means no cap.
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts
                     WHERE points >= ?1
                       AND (?2 IS NULL OR EXISTS (
                           SELECT 1 FROM json_each(contacts.tags) AS je WHERE je.value = ?2
                       ))
                     ORDER BY rowid ASC
                     LIMIT COALESCE(?3, -1)"
                ),
                params![min_points as i64, opt_text(tag), opt_int(limit)],
            )
            .await
            .map_err(|e| StorageError::Query(format!("query_contacts: {e}")))?;

        let mut contacts = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StorageError::Query(format!("query_contacts: {e}")))?
        {
            contacts.push(row_to_contact(&row)?);
        }
        Ok(contacts)
    }

    // ── Campaigns ───────────────────────────────────────────────────

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StorageError> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO campaigns ({CAMPAIGN_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    campaign.id.to_string(),
                    campaign.message.as_str(),
                    campaign.filter.min_points as i64,
                    opt_text(campaign.filter.tag.as_deref()),
                    opt_int(campaign.filter.limit),
                    opt_text(campaign.direct_target.as_deref()),
                    status_to_str(campaign.status),
                    campaign.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StorageError::Query(format!("insert_campaign: {e}")))?;

        debug!(campaign_id = %campaign.id, "Campaign persisted");
        Ok(())
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, StorageError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| StorageError::Query(format!("get_campaign: {e}")))?;

        let campaign = match rows.next().await {
            Ok(Some(row)) => row_to_campaign(&row)?,
            Ok(None) => return Ok(None),
            Err(e) => return Err(StorageError::Query(format!("get_campaign: {e}"))),
        };

        let sent_to = self.load_sent_to(campaign.id).await?;
        Ok(Some(Campaign { sent_to, ..campaign }))
    }

    async fn list_ready_campaigns(&self) -> Result<Vec<Campaign>, StorageError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                     WHERE status IN ('queued', 'dispatching')
                     ORDER BY created_at ASC, rowid ASC"
                ),
                (),
            )
            .await
            .map_err(|e| StorageError::Query(format!("list_ready_campaigns: {e}")))?;

        let mut campaigns = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StorageError::Query(format!("list_ready_campaigns: {e}")))?
        {
            campaigns.push(row_to_campaign(&row)?);
        }

        // Attach dedup sets after the scan; the row cursor must be drained
        // before issuing further queries on the shared connection.
        let mut out = Vec::with_capacity(campaigns.len());
        for campaign in campaigns {
            let sent_to = self.load_sent_to(campaign.id).await?;
            out.push(Campaign { sent_to, ..campaign });
        }
        Ok(out)
    }

    async fn record_send(
        &self,
        campaign_id: Uuid,
        contact_id: &str,
    ) -> Result<bool, StorageError> {
        let affected = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO campaign_sends (campaign_id, contact_id, sent_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    campaign_id.to_string(),
                    contact_id,
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| StorageError::Query(format!("record_send: {e}")))?;

        Ok(affected > 0)
    }

    async fn cas_campaign_status(
        &self,
        id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<bool, StorageError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE campaigns SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![status_to_str(to), id.to_string(), status_to_str(from)],
            )
            .await
            .map_err(|e| StorageError::Query(format!("cas_campaign_status: {e}")))?;

        if affected > 0 {
            debug!(campaign_id = %id, from = %from, to = %to, "Campaign status updated");
        }
        Ok(affected > 0)
    }

    // ── Orders ──────────────────────────────────────────────────────

    async fn insert_order(&self, order: &Order) -> Result<(), StorageError> {
        self.conn()
            .execute(
                "INSERT INTO orders (id, contact_id, body, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    order.id.to_string(),
                    order.contact_id.as_str(),
                    order.text.as_str(),
                    order.status.to_string(),
                    order.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StorageError::Query(format!("insert_order: {e}")))?;
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StorageError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, contact_id, body, status, created_at FROM orders
                 ORDER BY created_at DESC, rowid DESC",
                (),
            )
            .await
            .map_err(|e| StorageError::Query(format!("list_orders: {e}")))?;

        let mut orders = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StorageError::Query(format!("list_orders: {e}")))?
        {
            orders.push(row_to_order(&row)?);
        }
        Ok(orders)
    }
}
