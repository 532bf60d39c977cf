//! Creator reputation tracking
//!
//! Classification precedence: blacklist, then elite allow-list, then the
//! creator's recorded outcome history, then unknown. History never promotes
//! or demotes a wallet into or out of the explicit lists.

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tracing::info;

use crate::config::ReputationConfig;
use crate::token::Reputation;

const GOOD_SUCCESS_RATE: f64 = 0.5;
const BAD_SUCCESS_RATE: f64 = 0.2;

/// Running statistics for one creator
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReputationRecord {
    /// Launches observed by the scanner
    pub launches: u64,
    /// Outcomes recorded through [`ReputationTracker::record_outcome`]
    pub outcomes: u64,
    pub successes: u64,
    /// successes / outcomes, 0 until an outcome is recorded
    pub success_rate: f64,
}

impl ReputationRecord {
    fn classify(&self) -> Reputation {
        if self.outcomes == 0 {
            Reputation::Unknown
        } else if self.success_rate > GOOD_SUCCESS_RATE {
            Reputation::Good
        } else if self.success_rate < BAD_SUCCESS_RATE {
            Reputation::Bad
        } else {
            Reputation::Unknown
        }
    }
}

/// Concurrent creator reputation tracker
#[derive(Default)]
pub struct ReputationTracker {
    elite: DashSet<String>,
    blacklisted: DashSet<String>,
    records: DashMap<String, ReputationRecord>,
}

impl ReputationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the allow/deny lists from configuration
    pub fn from_config(config: &ReputationConfig) -> Self {
        let tracker = Self::new();
        for wallet in config.elite.iter().filter(|w| !w.trim().is_empty()) {
            tracker.elite.insert(wallet.trim().to_string());
        }
        for wallet in config.blacklisted.iter().filter(|w| !w.trim().is_empty()) {
            tracker.blacklisted.insert(wallet.trim().to_string());
        }
        if !tracker.elite.is_empty() || !tracker.blacklisted.is_empty() {
            info!(
                elite = tracker.elite.len(),
                blacklisted = tracker.blacklisted.len(),
                "Reputation lists loaded"
            );
        }
        tracker
    }

    /// Classify a creator from current state
    pub fn classify(&self, creator: &str) -> Reputation {
        if creator.is_empty() {
            return Reputation::Unknown;
        }
        if self.blacklisted.contains(creator) {
            return Reputation::Bad;
        }
        if self.elite.contains(creator) {
            return Reputation::Elite;
        }
        self.records
            .get(creator)
            .map(|r| r.classify())
            .unwrap_or(Reputation::Unknown)
    }

    /// Count a launch by this creator, creating its record on first sight
    pub fn observe_launch(&self, creator: &str) {
        if creator.is_empty() {
            return;
        }
        self.records.entry(creator.to_string()).or_default().launches += 1;
    }

    /// Record whether one of the creator's launches succeeded
    pub fn record_outcome(&self, creator: &str, success: bool) {
        if creator.is_empty() {
            return;
        }
        let mut record = self.records.entry(creator.to_string()).or_default();
        record.outcomes += 1;
        if success {
            record.successes += 1;
        }
        record.success_rate = record.successes as f64 / record.outcomes as f64;
    }

    pub fn add_elite(&self, creator: &str) {
        self.elite.insert(creator.to_string());
        info!("Added elite dev: {}...", prefix(creator));
    }

    pub fn add_blacklisted(&self, creator: &str) {
        self.blacklisted.insert(creator.to_string());
        info!("Blacklisted dev: {}...", prefix(creator));
    }

    pub fn remove_elite(&self, creator: &str) -> bool {
        self.elite.remove(creator).is_some()
    }

    pub fn remove_blacklisted(&self, creator: &str) -> bool {
        self.blacklisted.remove(creator).is_some()
    }

    /// Snapshot of a creator's record
    pub fn record(&self, creator: &str) -> Option<ReputationRecord> {
        self.records.get(creator).map(|r| r.value().clone())
    }

    /// Number of creators with a record
    pub fn tracked_creators(&self) -> usize {
        self.records.len()
    }
}

fn prefix(s: &str) -> String {
    s.chars().take(8).collect()
}
