//! Mangrove admin - state core for the carbon-credit monitoring dashboard
//!
//! Keeps the project registry, MRV verification queue and transaction log for
//! one admin session, mirrors them to a durable store, and derives every view
//! the dashboard renders.
//!
//! ## Components
//!
//! - **Store**: key-value persistence of the three collections (SQLite or memory)
//! - **Registry**: the mutators, each followed by persist, log and re-render
//! - **Views**: pure read-side derivations (KPIs, tabs, map, chart)
//! - **Dashboard**: axum HTTP API over the registry
//! - **Relay**: Google ID token verification service

pub mod config;
pub mod dashboard;
pub mod models;
pub mod registry;
pub mod relay;
pub mod store;
pub mod views;
pub mod wallet;

pub use config::Config;
pub use registry::{Registry, RegistryError};
pub use store::{Store, StoreError};
