//! Service layer for literacy-progress
//!
//! Services encapsulate business logic between the web layer and the
//! repositories. Each service wraps database operations with:
//! - Input validation
//! - Cross-entity orchestration
//! - Event emission for audit/notifications
//! - Transaction boundaries
//!
//! ## Architecture
//!
//! ```text
//! Web layer (external, thin)
//!     ↓
//! Service layer (business logic)
//!     ↓
//! Repository layer (db/*.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod events;
pub mod activity_service;
pub mod profile_service;
pub mod weekly_service;

// Re-exports
pub use events::{EventBus, EventListener, ProgressEvent};
pub use activity_service::{ActivityOutcome, ActivityService};
pub use profile_service::{ProfileService, ProfileSummary, SkillBreakdown};
pub use weekly_service::{TargetGoals, WeeklyTargetService};

use crate::config::Config;
use crate::db::ProgressDb;
use std::sync::Arc;

/// Service container for dependency injection
///
/// Holds all services with a shared database pool and event bus.
pub struct Services {
    pub activity: Arc<ActivityService>,
    pub profile: Arc<ProfileService>,
    pub weekly: Arc<WeeklyTargetService>,
    pub events: Arc<EventBus>,
}

impl Services {
    /// Create all services with a shared database
    pub fn new(db: Arc<ProgressDb>) -> Self {
        Self::with_events(db, Arc::new(EventBus::new()))
    }

    /// Create all services with an event bus sized from config
    pub fn with_config(db: Arc<ProgressDb>, config: &Config) -> Self {
        Self::with_events(db, Arc::new(EventBus::with_capacity(config.event_capacity)))
    }

    fn with_events(db: Arc<ProgressDb>, events: Arc<EventBus>) -> Self {
        Self {
            activity: Arc::new(ActivityService::new(db.clone(), events.clone())),
            profile: Arc::new(ProfileService::new(db.clone(), events.clone())),
            weekly: Arc::new(WeeklyTargetService::new(db, events.clone())),
            events,
        }
    }
}
