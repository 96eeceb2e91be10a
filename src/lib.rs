//! Entitlements - subscription tiers and feature/capacity access
//!
//! This crate answers "may this school, trust or researcher use this
//! feature, and are they within their plan's limits?" from a static tier
//! catalogue and each owner's current subscription record.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod observability;
pub mod ports;
