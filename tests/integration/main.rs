//! Integration Tests
//!
//! Cross-crate tests through the root re-exports:
//! - Storage mode: persistent vs ephemeral, reopen
//! - Change feed: ordering, overflow policies, shutdown
//! - End-to-end workflow: a suite run reported case by case

#[path = "../common/mod.rs"]
mod common;

mod change_feed;
mod modes;
mod workflow;
