//! Event system for progress operations
//!
//! Provides an event bus for notifying listeners about scoring
//! outcomes. Useful for:
//! - Audit logging
//! - Push notifications (level ups, badge unlocks)
//! - Leaderboard refresh triggers

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Progress events emitted by services
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    // Account events
    UserRegistered {
        user_id: String,
    },

    // Scoring events
    XpAwarded {
        user_id: String,
        amount: i32,
        total_xp: i32,
    },
    LeveledUp {
        user_id: String,
        level: i32,
    },
    StreakChanged {
        user_id: String,
        streak: i32,
        reset: bool,
    },
    BadgeUnlocked {
        user_id: String,
        badge_code: String,
        badge_name: String,
    },

    // Weekly target events
    PeriodCreated {
        period_start: String,
        period_end: String,
        user_count: usize,
    },
    TargetCompleted {
        user_id: String,
        target_id: String,
        period_start: String,
    },
    PeriodDeleted {
        period_start: String,
        removed: usize,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    /// Handle an event
    fn on_event(&self, event: &ProgressEvent);
}

/// Event bus for broadcasting progress events
pub struct EventBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new event bus with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: ProgressEvent) {
        trace!(event = ?event, "Emitting progress event");
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::LeveledUp { user_id, level } => {
                debug!(user = %user_id, level = %level, "User leveled up");
            }
            ProgressEvent::BadgeUnlocked {
                user_id,
                badge_code,
                badge_name,
            } => {
                debug!(user = %user_id, code = %badge_code, name = %badge_name, "Badge unlocked");
            }
            ProgressEvent::TargetCompleted {
                user_id,
                period_start,
                ..
            } => {
                debug!(user = %user_id, period = %period_start, "Weekly target completed");
            }
            ProgressEvent::PeriodCreated {
                period_start,
                period_end,
                user_count,
            } => {
                debug!(
                    start = %period_start,
                    end = %period_end,
                    users = %user_count,
                    "Weekly period created"
                );
            }
            _ => {
                trace!(event = ?event, "Progress event");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}
