//! Progress Streaming
//!
//! Orchestrated calls report progress as a broadcast stream of events.
//! Callers subscribe to render incremental feedback; nothing in the core
//! depends on whether anyone is listening.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::generation::Variant;

const CHANNEL_CAPACITY: usize = 64;

/// Progress event types
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A pipeline stage began
    StageStarted {
        label: String,
        step: u32,
        total_steps: u32,
    },
    /// A transient failure is being retried after `delay`
    Retrying {
        message: String,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
    /// A quality-gate attempt received its critique score
    AttemptScored {
        attempt: u32,
        variant: Variant,
        score: u8,
    },
}

impl ProgressEvent {
    /// Human-readable line for direct display
    pub fn message(&self) -> String {
        match self {
            Self::StageStarted {
                label,
                step,
                total_steps,
            } => format!("[{}/{}] {}", step, total_steps, label),
            Self::Retrying { message, .. } => message.clone(),
            Self::AttemptScored {
                attempt,
                variant,
                score,
            } => format!("Attempt {} ({}) scored {}", attempt, variant, score),
        }
    }
}

/// Cloneable progress sender
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    sender: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Send an event through the broadcast channel.
    /// Silently discards if no receivers are listening.
    #[inline]
    pub fn emit(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }

    pub fn stage_started(&self, label: &str, step: u32, total_steps: u32) {
        self.emit(ProgressEvent::StageStarted {
            label: label.to_string(),
            step,
            total_steps,
        });
    }

    pub fn retrying(&self, attempt: u32, max_attempts: u32, delay: Duration) {
        let message = format!(
            "Rate limited, retrying in {:?} (attempt {}/{})",
            delay,
            attempt,
            max_attempts
        );
        self.emit(ProgressEvent::Retrying {
            message,
            attempt,
            max_attempts,
            delay,
        });
    }

    pub fn attempt_scored(&self, attempt: u32, variant: Variant, score: u8) {
        self.emit(ProgressEvent::AttemptScored {
            attempt,
            variant,
            score,
        });
    }
}
