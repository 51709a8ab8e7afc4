//! Batchwatch - batch lifecycle tracking and deadline monitoring
//!
//! Pipeline stages record the start, per-stage progress and end of each
//! nightly batch through the [`tracker`]. The [`monitor`] polls the tracker
//! and emails an alert when a batch misses its completion deadline, at most
//! once per batch and deadline.

#![allow(missing_docs)]

pub mod alerts;
pub mod app;
pub mod app_info;
pub mod boot;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod environment;
pub mod mailer;
pub mod metrics;
pub mod monitor;
pub mod setup_tracing;
pub mod tracker;
