//! Outward-facing session signals
//!
//! The dashboard layer (out of scope here) consumes a broadcast stream of
//! typed signals: status flips, one structured log entry per processed
//! event, and usage snapshots after each synthesis call. A bounded ring of
//! recent log entries mirrors what the dashboard shows on reconnect.

use crate::synth::UsageStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Retained log entries, matching the dashboard's view
const MAX_RECENT_LOGS: usize = 100;

/// Structured log entry category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Incoming viewer chat
    Chat,
    /// Generated reply
    Response,
    /// Gift received
    Gift,
    /// New follower
    Follow,
    /// Session/connection status change
    Status,
    /// Recoverable failure
    Error,
    /// Idle filler submission
    IdleAudio,
}

/// One structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Entry category
    pub kind: LogKind,
    /// Category-specific payload
    pub data: serde_json::Value,
    /// Entry creation time
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Build an entry stamped with the current time
    pub fn new(kind: LogKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Signals emitted by a running session
#[derive(Debug, Clone)]
pub enum SessionSignal {
    /// Session started or stopped
    Status {
        /// Whether the session is running
        running: bool,
    },
    /// Structured log entry
    Log(LogEntry),
    /// Usage snapshot after a synthesis call
    Usage(UsageStats),
}

/// Broadcast bus for session signals.
///
/// Slow or absent subscribers never block the pipeline; broadcast drops the
/// oldest entries for laggards.
pub struct SignalBus {
    sender: broadcast::Sender<SessionSignal>,
    recent: Mutex<VecDeque<LogEntry>>,
}

impl SignalBus {
    /// Create a bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    /// Subscribe to session signals
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.sender.subscribe()
    }

    /// Emit a status change
    pub fn status(&self, running: bool) {
        let _ = self.sender.send(SessionSignal::Status { running });
    }

    /// Emit a structured log entry, retaining it in the recent ring
    pub fn log(&self, kind: LogKind, data: serde_json::Value) {
        let entry = LogEntry::new(kind, data);
        {
            let mut recent = self.recent.lock().unwrap();
            recent.push_front(entry.clone());
            if recent.len() > MAX_RECENT_LOGS {
                recent.pop_back();
            }
        }
        let _ = self.sender.send(SessionSignal::Log(entry));
    }

    /// Emit a usage snapshot
    pub fn usage(&self, stats: UsageStats) {
        let _ = self.sender.send(SessionSignal::Usage(stats));
    }

    /// Most recent log entries, newest first
    pub fn recent_logs(&self) -> Vec<LogEntry> {
        self.recent.lock().unwrap().iter().cloned().collect()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(256)
    }
}
