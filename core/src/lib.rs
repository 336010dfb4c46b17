//! dailystats-core: usage-statistics aggregation for the daily
//! financial-data platform.
//!
//! One pass over a snapshot of raw usage-log rows produces five canonical
//! rollup tables (monthly users, per-institution codes, per-user activity,
//! per-database codes, subscriber status counts), each independently
//! consumable by the reporting layer.
//!
//! Data flow: raw rows → normalizer → joiner → rollup engine → tables.
//! Every stage produces new immutable values; nothing is recomputed
//! incrementally and no stage reads shared mutable state.

pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod joiner;
pub mod normalizer;
pub mod pipeline;
pub mod rollup;
pub mod source;
pub mod store;
pub mod types;
pub mod views;
