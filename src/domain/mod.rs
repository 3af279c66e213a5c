//! Core domain types and logic.

pub mod bar;
pub mod pivot;
pub mod pivot_detect;
pub mod level;
pub mod rules;
pub mod entry;
pub mod exit;
pub mod position;
pub mod engine;
pub mod metrics;
pub mod error;
