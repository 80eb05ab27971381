//! Kudos - Multi-tenant Slack kudos bot
//!
//! This crate keeps one Socket Mode connection per installed workspace,
//! routes each inbound envelope to the first matching handler for its
//! class, and stores per-workspace kudos counters.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
