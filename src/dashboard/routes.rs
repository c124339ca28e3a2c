//! Dashboard HTTP routes
//!
//! Handlers for the dashboard page and API endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::SharedState;
use crate::models::{Project, Transaction, Verification, VerificationStatus};
use crate::registry::{MrvUpload, MutationReport, NewProject, NewProjectForm, RegistryError};
use crate::views::{
    co2_series, find_project, find_project_by_name, kpis, map_markers, projects_for_tab,
    recent_transactions, verifications_for_project, ChartSeries, DashboardView, Kpis, MapMarker,
    ProjectTab, MAP_DEFAULT_CENTER, MAP_DEFAULT_ZOOM,
};
use crate::wallet::{self, WalletSession};

/// Error body returned by every failing endpoint
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl RegistryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Cancelled(_) => StatusCode::CONFLICT,
            Self::ExternalService(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, RegistryError>;

/// Unwrap a JSON body, reporting malformed input as a validation failure
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RegistryError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| RegistryError::Validation(rejection.body_text()))
}

/// Dashboard index page
pub async fn index() -> impl IntoResponse {
    Html(include_str!("../../static/index.html"))
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

// === Reads ===

/// GET /api/dashboard
pub async fn api_dashboard(State(state): State<SharedState>) -> Json<DashboardView> {
    let state = state.read().await;
    Json(state.registry.view())
}

/// GET /api/kpis
pub async fn api_kpis(State(state): State<SharedState>) -> Json<Kpis> {
    let state = state.read().await;
    Json(kpis(state.registry.projects()))
}

#[derive(Deserialize)]
pub struct ProjectsQuery {
    pub tab: Option<String>,
}

/// GET /api/projects?tab=registered|managed|all
pub async fn api_projects(
    State(state): State<SharedState>,
    Query(query): Query<ProjectsQuery>,
) -> ApiResult<Vec<Project>> {
    let tab = match query.tab.as_deref() {
        Some(tab) => tab.parse::<ProjectTab>().map_err(RegistryError::Validation)?,
        None => ProjectTab::default(),
    };

    let state = state.read().await;
    let projects = projects_for_tab(state.registry.projects(), tab)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(projects))
}

/// GET /api/projects/:id
pub async fn api_project_detail(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    let state = state.read().await;
    find_project(state.registry.projects(), &id)
        .cloned()
        .map(Json)
        .ok_or_else(|| RegistryError::NotFound(format!("project {}", id)))
}

#[derive(Deserialize)]
pub struct VerificationsQuery {
    pub project: Option<String>,
}

/// GET /api/verifications?project=<name>
pub async fn api_verifications(
    State(state): State<SharedState>,
    Query(query): Query<VerificationsQuery>,
) -> Json<Vec<Verification>> {
    let state = state.read().await;
    let verifications = state.registry.verifications();
    match query.project {
        Some(name) => Json(
            verifications_for_project(verifications, &name)
                .into_iter()
                .cloned()
                .collect(),
        ),
        None => Json(verifications.to_vec()),
    }
}

#[derive(Deserialize)]
pub struct ReviewQuery {
    pub project: String,
}

/// Everything the review modal shows for one project name
#[derive(Serialize)]
pub struct ReviewResponse {
    pub name: String,
    /// Absent when verifications name a project that is not registered
    pub project: Option<Project>,
    pub verifications: Vec<Verification>,
}

/// GET /api/review?project=<name>
pub async fn api_review(
    State(state): State<SharedState>,
    Query(query): Query<ReviewQuery>,
) -> ApiResult<ReviewResponse> {
    let state = state.read().await;
    let project = find_project_by_name(state.registry.projects(), &query.project).cloned();
    let verifications: Vec<Verification> =
        verifications_for_project(state.registry.verifications(), &query.project)
            .into_iter()
            .cloned()
            .collect();

    if project.is_none() && verifications.is_empty() {
        return Err(RegistryError::NotFound(format!("project {}", query.project)));
    }

    Ok(Json(ReviewResponse {
        name: query.project,
        project,
        verifications,
    }))
}

#[derive(Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<usize>,
}

/// GET /api/transactions?limit=N
pub async fn api_transactions(
    State(state): State<SharedState>,
    Query(query): Query<TransactionsQuery>,
) -> Json<Vec<Transaction>> {
    let state = state.read().await;
    let txs = state.registry.transactions();
    let limit = query.limit.unwrap_or(txs.len());
    Json(recent_transactions(txs, limit).to_vec())
}

#[derive(Serialize)]
pub struct MapResponse {
    pub center: [f64; 2],
    pub zoom: u8,
    pub markers: Vec<MapMarker>,
}

/// GET /api/map/markers
pub async fn api_map_markers(State(state): State<SharedState>) -> Json<MapResponse> {
    let state = state.read().await;
    Json(MapResponse {
        center: MAP_DEFAULT_CENTER,
        zoom: MAP_DEFAULT_ZOOM,
        markers: map_markers(state.registry.projects()),
    })
}

/// GET /api/chart/co2
pub async fn api_co2_chart() -> Json<ChartSeries> {
    Json(co2_series())
}

// === Mutations ===

#[derive(Serialize)]
pub struct ProjectResponse {
    pub project: Project,
    pub report: MutationReport,
}

/// POST /api/projects
pub async fn api_register_project(
    State(state): State<SharedState>,
    payload: Result<Json<NewProjectForm>, JsonRejection>,
) -> ApiResult<ProjectResponse> {
    let input = NewProject::try_from(json_body(payload)?)?;
    let mut state = state.write().await;
    let (project, report) = state.registry.register_project(input)?;
    Ok(Json(ProjectResponse { project, report }))
}

#[derive(Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// DELETE /api/projects/:id?confirm=true
pub async fn api_delete_project(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<ConfirmQuery>,
) -> ApiResult<MutationReport> {
    let confirmed = query.confirm;
    let mut state = state.write().await;
    let report = state.registry.delete_project(&id, move |_: &str| confirmed)?;
    Ok(Json(report))
}

#[derive(Deserialize)]
pub struct VerificationRequest {
    pub project: String,
}

/// POST /api/verifications/approve
pub async fn api_approve_verification(
    State(state): State<SharedState>,
    payload: Result<Json<VerificationRequest>, JsonRejection>,
) -> ApiResult<MutationReport> {
    let req = json_body(payload)?;
    let mut state = state.write().await;
    let report = state
        .registry
        .update_verification_status(&req.project, VerificationStatus::Approved)?;
    Ok(Json(report))
}

/// POST /api/verifications/reject
pub async fn api_reject_verification(
    State(state): State<SharedState>,
    payload: Result<Json<VerificationRequest>, JsonRejection>,
) -> ApiResult<MutationReport> {
    let req = json_body(payload)?;
    let mut state = state.write().await;
    let report = state
        .registry
        .update_verification_status(&req.project, VerificationStatus::RevisionRequired)?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub verification: Verification,
    pub report: MutationReport,
}

/// POST /api/mrv/upload
pub async fn api_mrv_upload(
    State(state): State<SharedState>,
    payload: Result<Json<MrvUpload>, JsonRejection>,
) -> ApiResult<UploadResponse> {
    let upload = json_body(payload)?;
    let mut state = state.write().await;
    let (verification, report) = state.registry.ingest_mrv_upload(upload)?;
    Ok(Json(UploadResponse {
        verification,
        report,
    }))
}

#[derive(Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// POST /api/reset
pub async fn api_reset(
    State(state): State<SharedState>,
    payload: Result<Json<ResetRequest>, JsonRejection>,
) -> ApiResult<MutationReport> {
    let confirmed = json_body(payload)?.confirm;
    let mut state = state.write().await;
    let report = state.registry.reset_all(move |_: &str| confirmed)?;
    Ok(Json(report))
}

// === Wallet ===

/// GET /api/wallet
pub async fn api_wallet(State(state): State<SharedState>) -> Json<Option<WalletSession>> {
    let state = state.read().await;
    Json(state.registry.wallet().cloned())
}

#[derive(Serialize)]
pub struct WalletConnectResponse {
    pub wallet: WalletSession,
    pub report: MutationReport,
}

/// POST /api/wallet/connect
pub async fn api_wallet_connect(
    State(state): State<SharedState>,
) -> ApiResult<WalletConnectResponse> {
    // Handshake runs without holding the lock
    let provider = state.read().await.wallet_provider.clone();
    let session = wallet::open_session(provider.as_ref()).await?;

    let mut state = state.write().await;
    let report = state.registry.record_wallet_connection(session.clone());
    Ok(Json(WalletConnectResponse {
        wallet: session,
        report,
    }))
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub disconnected: bool,
}

/// POST /api/wallet/disconnect
pub async fn api_wallet_disconnect(State(state): State<SharedState>) -> Json<DisconnectResponse> {
    let mut state = state.write().await;
    Json(DisconnectResponse {
        disconnected: state.registry.disconnect_wallet(),
    })
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize)]
pub struct ContractReadRequest {
    #[serde(default)]
    pub address: String,
}

/// POST /api/wallet/contract/read
pub async fn api_contract_read(
    payload: Result<Json<ContractReadRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let message = wallet::read_contract(&json_body(payload)?.address)?;
    Ok(Json(MessageResponse {
        success: true,
        message,
    }))
}

#[derive(Deserialize)]
pub struct TokenTransferRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub amount: String,
}

/// POST /api/wallet/token/transfer
pub async fn api_token_transfer(
    payload: Result<Json<TokenTransferRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let req = json_body(payload)?;
    let message = wallet::token_transfer(&req.token, &req.amount)?;
    Ok(Json(MessageResponse {
        success: true,
        message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (RegistryError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (RegistryError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (RegistryError::Cancelled("x".into()), StatusCode::CONFLICT),
            (RegistryError::ExternalService("x".into()), StatusCode::BAD_GATEWAY),
            (
                RegistryError::Persistence(StoreError::Io("disk".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_wallet_errors_map_by_kind() {
        use crate::wallet::WalletError;

        let invalid = RegistryError::from(WalletError::InvalidInput("bad amount".into()));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let rejected = RegistryError::from(WalletError::Rejected);
        assert_eq!(rejected.status_code(), StatusCode::BAD_GATEWAY);
    }
}
