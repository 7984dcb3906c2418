// levpool-core: leveraged pool settlement engine.
// users queue mints and burns against a long/short pool; each upkeep rebalances the two
// sides on the price move and then settles the queue at one fair rate.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, CommitId, Side, CommitType, Price, Leverage
//   2.x  math.rs: fixed-point ratio/scale, fee, rebalance, mint/burn rates
//   3.x  token.rs: token seam + in-memory token ledger
//   4.x  oracle.rs: raw feed normalization, SMA oracle
//   5.x  commitment.rs: commitment record, shadow pools, unexecuted window
//   6.x  committer.rs: commit/uncommit, batch execution
//   7.x  ledger.rs: balances, price change, committer capability, roles
//   8.x  engine/: one pool: commits, atomic upkeep, admin
//   9.x  config.rs: pool parameters + presets
//   10.x events.rs: state transition events for audit
//   11.x keeper.rs: upkeep scheduling against an oracle

// core settlement modules
pub mod commitment;
pub mod committer;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod math;
pub mod types;

// integration modules
pub mod config;
pub mod keeper;
pub mod oracle;
pub mod token;

// re exports for convenience
pub use commitment::*;
pub use committer::*;
pub use config::*;
pub use engine::*;
pub use events::*;
pub use keeper::*;
pub use ledger::*;
pub use math::Rebalance;
pub use oracle::*;
pub use token::*;
pub use types::*;
