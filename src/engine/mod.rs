// 8.0: settlement engine. one pool: ledger, committer, event log, clock.
// the engine is the only place upkeeps are sequenced, and it makes each one all-or-nothing.
// deterministic and event-driven with no external I/O.

mod admin;
mod commits;
mod config;
mod core;
mod results;
mod upkeep;

pub use config::EngineConfig;
pub use core::SettlementEngine;
pub use results::{EngineError, UpkeepResult};
