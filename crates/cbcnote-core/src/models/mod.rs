//! Data models for extracted lab results and configuration.

pub mod bundle;
pub mod config;
