//! Commitment records and the bookkeeping around them.
//!
//! A commitment is a deferred mint or burn. While it waits, its amount is counted in
//! the shadow pool for its type, and its id sits inside the unexecuted window.

use crate::types::{AccountId, CommitId, CommitType, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// A queued request. Immutable once created; removed on uncommit or settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub id: CommitId,
    pub commit_type: CommitType,
    pub amount: Decimal,
    pub owner: AccountId,
    pub created_at: Timestamp,
}

impl Commitment {
    /// Whether a price set at `price_timestamp` may settle this commitment.
    /// It must be strictly older than the front-running interval at that moment.
    pub fn is_settleable(&self, price_timestamp: Timestamp, front_running_interval: i64) -> bool {
        price_timestamp.elapsed_since(self.created_at) > front_running_interval
    }
}

/// Per-type total of committed but unsettled amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowPools {
    amounts: [Decimal; 4],
}

impl ShadowPools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, commit_type: CommitType) -> Decimal {
        self.amounts[commit_type.index()]
    }

    /// Shares already burned from users and waiting on an exit settlement.
    pub fn pending_burn(&self, side: Side) -> Decimal {
        self.get(CommitType::burn(side))
    }

    /// Settlement asset escrowed and waiting on an entry settlement.
    pub fn pending_mint(&self, side: Side) -> Decimal {
        self.get(CommitType::mint(side))
    }

    pub fn can_add(&self, commit_type: CommitType, amount: Decimal) -> bool {
        self.get(commit_type).checked_add(amount).is_some()
    }

    /// Returns false and leaves the aggregate untouched if it would overflow.
    pub fn add(&mut self, commit_type: CommitType, amount: Decimal) -> bool {
        match self.get(commit_type).checked_add(amount) {
            Some(total) => {
                self.amounts[commit_type.index()] = total;
                true
            }
            None => false,
        }
    }

    pub fn can_remove(&self, commit_type: CommitType, amount: Decimal) -> bool {
        self.get(commit_type) >= amount
    }

    /// Returns false and leaves the aggregate untouched if it would go negative.
    pub fn remove(&mut self, commit_type: CommitType, amount: Decimal) -> bool {
        if !self.can_remove(commit_type, amount) {
            return false;
        }
        self.amounts[commit_type.index()] -= amount;
        true
    }
}

/// Ids that may still need execution. Grows at the tail on commit, shrinks from the
/// head on execution, collapses to empty. May contain holes left by uncommits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnexecutedWindow {
    range: Option<RangeInclusive<CommitId>>,
}

impl UnexecutedWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_none()
    }

    pub fn bounds(&self) -> Option<(CommitId, CommitId)> {
        self.range.as_ref().map(|r| (*r.start(), *r.end()))
    }

    pub fn earliest(&self) -> Option<CommitId> {
        self.bounds().map(|(earliest, _)| earliest)
    }

    pub fn latest(&self) -> Option<CommitId> {
        self.bounds().map(|(_, latest)| latest)
    }

    pub fn contains(&self, id: CommitId) -> bool {
        self.range.as_ref().is_some_and(|r| r.contains(&id))
    }

    /// A new commitment always becomes the tail.
    pub fn push(&mut self, id: CommitId) {
        let earliest = self.earliest().unwrap_or(id);
        self.range = Some(earliest..=id);
    }

    /// Window maintenance for a removed commitment. Bumps the head forward if the head
    /// was removed, pulls the tail back if the tail was removed.
    pub fn remove(&mut self, id: CommitId) {
        let Some((mut earliest, mut latest)) = self.bounds() else {
            return;
        };

        if id == earliest {
            earliest = earliest.next();
            if earliest > latest {
                self.range = None;
                return;
            }
        }

        if id == latest {
            // earliest < id here, so the tail never crosses the head
            latest = CommitId(latest.0 - 1);
        }

        self.range = Some(earliest..=latest);
    }

    /// Batch stopped before the tail: `next` becomes the new head.
    pub fn advance_to(&mut self, next: CommitId) {
        let Some((_, latest)) = self.bounds() else {
            return;
        };
        self.range = if next > latest { None } else { Some(next..=latest) };
    }

    pub fn clear(&mut self) {
        self.range = None;
    }
}
