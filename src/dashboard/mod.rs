//! Dashboard - HTTP API over the project registry
//!
//! Provides:
//! - KPI, project, verification and transaction-log reads
//! - Project review lookup by name
//! - Project registration and deletion
//! - MRV upload intake and approval workflow
//! - Wallet connection for the top bar
//! - Static dashboard assets

pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::registry::Registry;
use crate::wallet::{DemoWallet, WalletProvider};

/// Dashboard state shared across handlers
pub struct DashboardState {
    pub registry: Registry,
    pub wallet_provider: Arc<dyn WalletProvider>,
}

pub type SharedState = Arc<RwLock<DashboardState>>;

/// Create the dashboard router
pub fn create_router(state: SharedState, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(routes::index))
        // Read API
        .route("/api/dashboard", get(routes::api_dashboard))
        .route("/api/kpis", get(routes::api_kpis))
        .route(
            "/api/projects",
            get(routes::api_projects).post(routes::api_register_project),
        )
        .route(
            "/api/projects/:id",
            get(routes::api_project_detail).delete(routes::api_delete_project),
        )
        .route("/api/review", get(routes::api_review))
        .route("/api/verifications", get(routes::api_verifications))
        .route("/api/transactions", get(routes::api_transactions))
        .route("/api/map/markers", get(routes::api_map_markers))
        .route("/api/chart/co2", get(routes::api_co2_chart))
        // MRV workflow
        .route("/api/verifications/approve", post(routes::api_approve_verification))
        .route("/api/verifications/reject", post(routes::api_reject_verification))
        .route("/api/mrv/upload", post(routes::api_mrv_upload))
        // Wallet
        .route("/api/wallet", get(routes::api_wallet))
        .route("/api/wallet/connect", post(routes::api_wallet_connect))
        .route("/api/wallet/disconnect", post(routes::api_wallet_disconnect))
        .route("/api/wallet/contract/read", post(routes::api_contract_read))
        .route("/api/wallet/token/transfer", post(routes::api_token_transfer))
        // Maintenance
        .route("/api/reset", post(routes::api_reset))
        // Health check
        .route("/health", get(routes::health))
        // Static files
        .nest_service("/static", tower_http::services::ServeDir::new(static_dir))
        .with_state(state)
}

impl DashboardState {
    /// State with the demo wallet provider built from `config.wallet`
    pub fn new(config: &Config, registry: Registry) -> Self {
        let wallet_provider = Arc::new(DemoWallet::new(config.wallet.clone()));
        Self::with_provider(registry, wallet_provider)
    }

    pub fn with_provider(registry: Registry, wallet_provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            registry,
            wallet_provider,
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }
}
