//! Incremental collector for Steam catalog, player count and review data
//!
//! One call to [`collect::run_collection_pass`] refreshes whichever datasets
//! are stale, writes them atomically as JSON under the output directory, and
//! records progress in a ledger so interrupted runs resume where they left
//! off.

pub mod cli;
pub mod collect;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod steam;
pub mod store;
