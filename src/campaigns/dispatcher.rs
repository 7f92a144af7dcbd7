//! Campaign dispatcher — the timer-driven dispatch cycle.
//!
//! The dispatcher holds no persistent state of its own: eligibility comes
//! from the campaign store's ready-scan and dedup comes from the durable
//! `sent_to` set, both re-read every cycle. That is what makes killing the
//! process mid-campaign safe — a restarted worker runs the same cycle over
//! the same durable state and finishes the job.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::campaigns::model::{Campaign, CampaignStatus, render_message};
use crate::campaigns::store::CampaignStore;
use crate::channels::ChannelAdapter;
use crate::config::DispatcherConfig;
use crate::contacts::{Contact, ContactDirectory};
use crate::error::Result;
use crate::events::{DomainEvent, EventBus};

/// Dependencies for the dispatcher.
pub struct DispatcherDeps {
    pub campaigns: Arc<CampaignStore>,
    pub directory: Arc<ContactDirectory>,
    pub channel: Arc<dyn ChannelAdapter>,
    pub bus: EventBus,
}

/// Schedules and executes campaign dispatch cycles.
pub struct Dispatcher {
    config: DispatcherConfig,
    campaigns: Arc<CampaignStore>,
    directory: Arc<ContactDirectory>,
    channel: Arc<dyn ChannelAdapter>,
    bus: EventBus,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig, deps: DispatcherDeps) -> Self {
        Self {
            config,
            campaigns: deps.campaigns,
            directory: deps.directory,
            channel: deps.channel,
            bus: deps.bus,
        }
    }

    /// Run one dispatch cycle: process every ready campaign sequentially.
    ///
    /// A failure in one campaign is logged and never aborts the rest of
    /// the cycle.
    pub async fn run_cycle(&self) {
        let ready = match self.campaigns.list_ready().await {
            Ok(ready) => ready,
            Err(e) => {
                error!("Ready-scan failed: {}", e);
                return;
            }
        };

        if !ready.is_empty() {
            debug!(count = ready.len(), "Dispatch cycle");
        }

        for campaign in ready {
            if let Err(e) = self.process_campaign(&campaign).await {
                error!(campaign_id = %campaign.id, "Campaign processing failed: {}", e);
            }
        }
    }

    /// Process a single ready campaign within one cycle.
    async fn process_campaign(&self, campaign: &Campaign) -> Result<()> {
        let targets = self.resolve_targets(campaign).await?;

        // An empty resolved set (including a direct target that does not
        // exist) completes immediately with zero sends.
        if targets.is_empty() {
            self.complete(campaign.id, campaign.sent_to.len()).await?;
            return Ok(());
        }

        let pending: Vec<&Contact> = targets
            .iter()
            .filter(|c| !campaign.was_sent_to(&c.id))
            .collect();

        if pending.is_empty() {
            self.complete(campaign.id, campaign.sent_to.len()).await?;
            return Ok(());
        }

        if campaign.status == CampaignStatus::Queued {
            self.campaigns
                .transition(campaign.id, CampaignStatus::Dispatching)
                .await?;
        }

        let mut sent_count = targets.len() - pending.len();
        let last = pending.len() - 1;

        for (i, contact) in pending.iter().enumerate() {
            let text = render_message(&campaign.message, &contact.display_name);

            match self.channel.send(&contact.id, &text).await {
                Ok(()) => {
                    // Commit the send before announcing it. A storage
                    // failure here means the contact may be retried later;
                    // an unrecorded success is the accepted failure mode.
                    match self.campaigns.record_send(campaign.id, &contact.id).await {
                        Ok(_new) => {
                            sent_count += 1;
                            self.bus.publish(DomainEvent::CampaignProgress {
                                campaign_id: campaign.id,
                                sent_count,
                                target: targets.len(),
                                contact_id: contact.id.clone(),
                            });
                        }
                        Err(e) => {
                            warn!(
                                campaign_id = %campaign.id,
                                contact_id = %contact.id,
                                "Send succeeded but could not be recorded: {}", e
                            );
                        }
                    }
                }
                Err(e) => {
                    // Transient: the contact stays out of `sent_to` and is
                    // retried on a later cycle.
                    warn!(
                        campaign_id = %campaign.id,
                        contact_id = %contact.id,
                        "Send failed, will retry next cycle: {}", e
                    );
                }
            }

            if i < last {
                tokio::time::sleep(self.config.send_delay).await;
            }
        }

        // Completion is judged against durable state, not this cycle's
        // in-memory tally.
        let fresh = self
            .campaigns
            .get(campaign.id)
            .await?
            .unwrap_or_else(|| campaign.clone());
        if targets.iter().all(|c| fresh.was_sent_to(&c.id)) {
            self.complete(campaign.id, fresh.sent_to.len()).await?;
        }

        Ok(())
    }

    /// Resolve the campaign's target set: the direct target if set (and
    /// existing), otherwise the segment query.
    async fn resolve_targets(&self, campaign: &Campaign) -> Result<Vec<Contact>> {
        if let Some(target_id) = &campaign.direct_target {
            return Ok(self.directory.get(target_id).await?.into_iter().collect());
        }

        self.directory
            .query_by_segment(
                campaign.filter.min_points,
                campaign.filter.tag.as_deref(),
                campaign.filter.limit,
            )
            .await
    }

    async fn complete(&self, id: Uuid, sent_count: usize) -> Result<()> {
        self.campaigns
            .transition(id, CampaignStatus::Completed)
            .await?;
        info!(campaign_id = %id, sent_count, "Campaign completed");
        self.bus.publish(DomainEvent::CampaignCompleted {
            campaign_id: id,
            sent_count,
        });
        Ok(())
    }

    /// Spawn the periodic cycle. The returned handle stops it.
    pub fn spawn(self: Arc<Self>) -> DispatcherHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let cycle_interval = self.config.cycle_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(cycle_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => self.run_cycle().await,
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("Dispatcher stopped");
        });

        DispatcherHandle {
            shutdown_tx,
            handle,
        }
    }
}

/// Stop handle for a spawned dispatcher.
pub struct DispatcherHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Signal the cycle loop to stop and wait for it to wind down.
    /// An in-flight cycle finishes first; durable state stays consistent.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}
