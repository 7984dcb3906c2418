// 1.0: all the primitives live here. ids, sides, commit types, prices, leverage, timestamps.
// each is a newtype so the compiler catches type mixups.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl AccountId {
    // the "no one" address. never a valid role holder or token recipient.
    pub const ZERO: AccountId = AccountId(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitId(pub u64);

impl CommitId {
    // ids start at 1 so the window arithmetic never has to step below zero
    pub const FIRST: CommitId = CommitId(1);

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(pub u32);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool:{}", self.0)
    }
}

// Long = gains when price goes up. Short = gains when price goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

// 1.1: what a commitment asks for. Enter* mints share tokens, Exit* burns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitType {
    EnterLong,
    ExitLong,
    EnterShort,
    ExitShort,
}

impl CommitType {
    pub const ALL: [CommitType; 4] = [
        CommitType::EnterLong,
        CommitType::ExitLong,
        CommitType::EnterShort,
        CommitType::ExitShort,
    ];

    pub fn mint(side: Side) -> Self {
        match side {
            Side::Long => CommitType::EnterLong,
            Side::Short => CommitType::EnterShort,
        }
    }

    pub fn burn(side: Side) -> Self {
        match side {
            Side::Long => CommitType::ExitLong,
            Side::Short => CommitType::ExitShort,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            CommitType::EnterLong | CommitType::ExitLong => Side::Long,
            CommitType::EnterShort | CommitType::ExitShort => Side::Short,
        }
    }

    pub fn is_mint(&self) -> bool {
        matches!(self, CommitType::EnterLong | CommitType::EnterShort)
    }

    pub fn is_burn(&self) -> bool {
        !self.is_mint()
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            CommitType::EnterLong => 0,
            CommitType::ExitLong => 1,
            CommitType::EnterShort => 2,
            CommitType::ExitShort => 3,
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommitType::EnterLong => "enter_long",
            CommitType::ExitLong => "exit_long",
            CommitType::EnterShort => "enter_short",
            CommitType::ExitShort => "exit_short",
        };
        write!(f, "{}", label)
    }
}

// 1.2: reference price. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: leverage multiplier applied to price moves. must be >= 1x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leverage(Decimal);

impl Leverage {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ONE {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Leverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

// 1.4: second-resolution timestamp. intervals in the pool are whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    // saturates at the ends of the clock instead of wrapping
    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    // signed: negative when `earlier` is actually later
    pub fn elapsed_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}
