// 10.0: every state change produces an event. used for audit trails, state reconstruction,
// and notifying external systems. the EventPayload enum lists all event types.

use crate::types::{AccountId, CommitId, CommitType, PoolId, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Commitment events
    CommitCreated(CommitEvent),
    CommitRemoved(CommitEvent),
    CommitExecuted(CommitExecutedEvent),
    CommitFailed(CommitFailedEvent),

    // Price events
    PriceChangeApplied(PriceChangeAppliedEvent),
    PriceChangeRejected(PriceChangeRejectedEvent),

    // Upkeep events
    KeeperRewardPaid(KeeperRewardPaidEvent),
    UpkeepPerformed(UpkeepPerformedEvent),

    // Role events
    FeeAddressChanged(RoleChangedEvent),
    KeeperChanged(RoleChangedEvent),
    GovernanceChanged(RoleChangedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitEvent {
    pub id: CommitId,
    pub commit_type: CommitType,
    pub amount: Decimal,
    pub owner: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitExecutedEvent {
    pub id: CommitId,
    pub commit_type: CommitType,
    pub owner: AccountId,
    pub amount_in: Decimal,
    // shares minted for entries, settlement asset paid for exits
    pub amount_out: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFailedEvent {
    pub id: CommitId,
    pub commit_type: CommitType,
    pub owner: AccountId,
    pub amount_refunded: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChangeAppliedEvent {
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub fee: Decimal,
    pub losing_side: Option<Side>,
    pub transfer: Decimal,
    pub long_balance: Decimal,
    pub short_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChangeRejectedEvent {
    pub old_price: Decimal,
    pub new_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperRewardPaidEvent {
    pub keeper: AccountId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpkeepPerformedEvent {
    pub pool_id: PoolId,
    pub price_timestamp: Timestamp,
    pub executed: usize,
    pub failed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleChangedEvent {
    pub old: AccountId,
    pub new: AccountId,
}

pub trait EventEmitter {
    fn emit(&mut self, timestamp: Timestamp, payload: EventPayload);
}

/// Bounded, ordered event store. Oldest events are dropped past `max_events`.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
    verbose: bool,
}

impl EventLog {
    pub fn new(max_events: usize, verbose: bool) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
            verbose,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn last_id(&self) -> Option<EventId> {
        self.events.last().map(|e| e.id)
    }
}

/// Events held back until the operation that produced them succeeds.
#[derive(Debug, Default)]
pub struct PendingEvents {
    entries: Vec<(Timestamp, EventPayload)>,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flush_into(self, sink: &mut impl EventEmitter) {
        for (timestamp, payload) in self.entries {
            sink.emit(timestamp, payload);
        }
    }
}

impl EventEmitter for PendingEvents {
    fn emit(&mut self, timestamp: Timestamp, payload: EventPayload) {
        self.entries.push((timestamp, payload));
    }
}

impl EventEmitter for EventLog {
    fn emit(&mut self, timestamp: Timestamp, payload: EventPayload) {
        let event = Event::new(EventId(self.next_id), timestamp, payload);
        self.next_id += 1;

        if self.verbose {
            info!(event_id = event.id.0, %timestamp, payload = ?event.payload, "event");
        } else {
            trace!(event_id = event.id.0, %timestamp, payload = ?event.payload, "event");
        }

        self.events.push(event);

        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
