//! FundMe: a minimal crowdfunding state machine.
//!
//! The crate is split into four small modules that higher layers (CLI,
//! test harnesses) combine without extra plumbing:
//!
//! * [`ledger`] — contribution accounting: cumulative amounts per address
//!   and the insertion-ordered funders sequence.
//! * [`oracle`] — the price-feed seam: the [`oracle::PriceFeed`] trait,
//!   fixed-point conversion into reference-currency units, and a mock
//!   aggregator for tests and local runs.
//! * [`contract`] — the contract surface: owner-gated withdrawals, the
//!   USD minimum check on `fund`, read accessors, and snapshots.
//! * [`chain`] — a single-contract execution environment that serializes
//!   calls, keeps external account balances, and gives every call
//!   all-or-nothing semantics.

pub mod chain;
pub mod contract;
pub mod ledger;
pub mod oracle;

pub use chain::{Chain, ChainError};
pub use contract::{ContractSnapshot, FundMe, FundMeError, MINIMUM_USD};
pub use ledger::{Address, Amount, FundingLedger};
pub use oracle::{MockAggregator, PriceFeed, PriceQuote};
