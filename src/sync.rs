//! Synchronization bridge
//!
//! Carries author metadata edits (label, help text, type) from the
//! configuration panel to every component that renders variables, and
//! "selected for configuration" signals back to the session.
//!
//! Each component holds an explicit `Subscription`. A publication is
//! delivered to every subscriber exactly once and dropped as soon as all of
//! them have taken it, so polling again never reapplies a stale edit.

use crate::variables::{Variable, VariableMetadata};
use log::debug;
use std::collections::VecDeque;

/// Handle identifying one subscriber on a bridge.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    slot: usize,
}

#[derive(Debug, Clone)]
struct Publication {
    seq: u64,
    meta: VariableMetadata,
}

/// Sequenced publish/subscribe channel for metadata edits.
#[derive(Debug, Default)]
pub struct SyncBridge {
    next_seq: u64,
    pending: VecDeque<Publication>,
    /// Next sequence number each subscriber has yet to receive.
    cursors: Vec<u64>,
    configuration_request: Option<Variable>,
}

impl SyncBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new subscriber. It receives only edits published from now on.
    pub fn subscribe(&mut self) -> Subscription {
        self.cursors.push(self.next_seq);
        Subscription {
            slot: self.cursors.len() - 1,
        }
    }

    /// Publish an edit and return its sequence number.
    ///
    /// If the latest pending edit for the same variable is identical, no new
    /// publication is made and its sequence number is returned.
    pub fn publish(&mut self, meta: VariableMetadata) -> u64 {
        if let Some(existing) = self.pending.iter().rev().find(|p| p.meta.id == meta.id) {
            if existing.meta == meta {
                debug!("Coalesced duplicate edit for {} (seq {})", meta.id, existing.seq);
                return existing.seq;
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        debug!("Published edit for {} (seq {})", meta.id, seq);
        self.pending.push_back(Publication { seq, meta });
        self.collect();
        seq
    }

    /// Every publication this subscriber has not seen yet, in order.
    pub fn take(&mut self, subscription: &Subscription) -> Vec<VariableMetadata> {
        let Some(cursor) = self.cursors.get_mut(subscription.slot) else {
            return Vec::new();
        };
        let from = *cursor;
        *cursor = self.next_seq;

        let delivered: Vec<VariableMetadata> = self
            .pending
            .iter()
            .filter(|p| p.seq >= from)
            .map(|p| p.meta.clone())
            .collect();
        self.collect();
        delivered
    }

    /// Drop publications every subscriber has received.
    fn collect(&mut self) {
        let oldest_unseen = self.cursors.iter().copied().min().unwrap_or(self.next_seq);
        while self
            .pending
            .front()
            .is_some_and(|p| p.seq < oldest_unseen)
        {
            self.pending.pop_front();
        }
    }

    /// Number of publications still waiting for at least one subscriber.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Nothing pending and no configuration request waiting.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.configuration_request.is_none()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Signal that a variable was selected for configuration.
    ///
    /// A newer request replaces one not yet taken.
    pub fn request_configuration(&mut self, variable: Variable) {
        debug!("Configuration requested for {}", variable.id);
        self.configuration_request = Some(variable);
    }

    pub fn take_configuration_request(&mut self) -> Option<Variable> {
        self.configuration_request.take()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
