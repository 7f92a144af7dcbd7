//! Campaigns — bulk outbound message jobs and their dispatch engine.

pub mod dispatcher;
pub mod model;
pub mod store;

pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use model::{Campaign, CampaignSpec, CampaignStatus, SegmentFilter};
pub use store::CampaignStore;
