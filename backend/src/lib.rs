//! Farm Dashboard Backend Library
//!
//! Core functionality for the farm device monitoring dashboard, including:
//! - Loading the farm master, device and disconnection tables (CSV or spreadsheet)
//! - Cascading farm filters and dashboard metrics
//! - Gateway-issue detection and daily time series
//! - Single-session login with admin and user roles

pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod state;
