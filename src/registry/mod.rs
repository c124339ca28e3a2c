//! Project registry - the dashboard's single owner of state
//!
//! Holds the three collections for one session together with the store they
//! are mirrored to. Every mutator follows the same sequence:
//! 1. Validate and transform the in-memory collection
//! 2. Persist the touched collection(s)
//! 3. Append a transaction describing the action
//! 4. Publish a fresh `RenderedView` to subscribers
//!
//! Persistence is best-effort: a failed write is logged, reported through
//! `MutationReport::persisted`, and the in-memory state stays authoritative.

pub mod ids;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::models::{
    actions, defaults, estimate_co2, Project, ProjectStatus, Transaction, Verification,
    VerificationStatus, DEFAULT_HEALTH,
};
use crate::store::{Store, StoreError, StoreKey};
use crate::views::{DashboardView, ViewKind, DEFAULT_RECENT_LIMIT};
use crate::wallet::{self, WalletError, WalletProvider, WalletSession};

use ids::{transaction_hash, IdSequence};

/// Project to register when none is selected for an MRV upload and the
/// registry is empty
pub const FALLBACK_PROJECT: &str = "Demo Project";
pub const DEFAULT_UPLOADER: &str = "Uploader";

/// Views refreshed after project and verification mutations
const PROJECT_VIEWS: &[ViewKind] = &[
    ViewKind::Kpis,
    ViewKind::Projects,
    ViewKind::Map,
    ViewKind::TxLog,
];
const MRV_VIEWS: &[ViewKind] = &[ViewKind::Verifications, ViewKind::Mrv, ViewKind::TxLog];

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("External service failure: {0}")]
    ExternalService(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl From<WalletError> for RegistryError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InvalidInput(msg) => Self::Validation(msg),
            other => Self::ExternalService(other.to_string()),
        }
    }
}

/// Answers a yes/no prompt before destructive actions
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Source of transaction timestamps
pub trait Clock: Send + Sync {
    /// Current time as `YYYY-MM-DD HH:MM`
    fn now(&self) -> String;
}

/// Wall clock in UTC
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        chrono::Utc::now().format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Clock that always reports the same time
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now(&self) -> String {
        self.0.clone()
    }
}

/// Validated registration input
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub owner: String,
    pub ha: f64,
    pub lat: f64,
    pub lon: f64,
    pub assigned_to: Option<String>,
    pub description: Option<String>,
}

impl NewProject {
    fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::Validation("Project name is required".into()));
        }
        if self.owner.trim().is_empty() {
            return Err(RegistryError::Validation("Owner is required".into()));
        }
        if !(self.ha.is_finite() && self.ha > 0.0) {
            return Err(RegistryError::Validation(
                "Area must be a positive number of hectares".into(),
            ));
        }
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(RegistryError::Validation(
                "Latitude and longitude must be numbers".into(),
            ));
        }
        Ok(())
    }
}

/// Registration form as submitted, before any field is trusted
///
/// Numeric fields accept JSON numbers or numeric strings; empty or missing
/// values are rejected when converting to `NewProject`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProjectForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub ha: Option<serde_json::Value>,
    #[serde(default)]
    pub lat: Option<serde_json::Value>,
    #[serde(default)]
    pub lon: Option<serde_json::Value>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn form_number(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) if !s.trim().is_empty() => s.trim().parse().ok(),
        _ => None,
    }
}

impl TryFrom<NewProjectForm> for NewProject {
    type Error = RegistryError;

    fn try_from(form: NewProjectForm) -> Result<Self, Self::Error> {
        let ha = form_number(form.ha.as_ref()).ok_or_else(|| {
            RegistryError::Validation("Area must be a positive number of hectares".into())
        })?;
        let (lat, lon) = match (form_number(form.lat.as_ref()), form_number(form.lon.as_ref())) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(RegistryError::Validation(
                    "Latitude and longitude must be numbers".into(),
                ))
            }
        };

        let project = NewProject {
            name: form.name.unwrap_or_default(),
            owner: form.owner.unwrap_or_default(),
            ha,
            lat,
            lon,
            assigned_to: form.assigned_to,
            description: form.description,
        };
        project.validate()?;
        Ok(project)
    }
}

/// An uploaded MRV file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MrvUpload {
    pub file: String,
    /// Project name; falls back to the first registered project
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
}

/// Outcome of a successful mutation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationReport {
    pub message: String,
    /// Log entry appended for this action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
    /// False when any write failed and the change lives only in memory
    pub persisted: bool,
    pub revision: u64,
}

/// Snapshot published after each mutation
#[derive(Debug, Clone)]
pub struct RenderedView {
    pub revision: u64,
    /// Views touched by the mutation that produced this snapshot
    pub changed: Vec<ViewKind>,
    pub dashboard: DashboardView,
}

/// Session state: collections, their store and the view publisher
pub struct Registry {
    store: Store,
    projects: Vec<Project>,
    verifications: Vec<Verification>,
    transactions: Vec<Transaction>,
    project_ids: IdSequence,
    clock: Box<dyn Clock>,
    wallet: Option<WalletSession>,
    recent_limit: usize,
    revision: u64,
    views: watch::Sender<RenderedView>,
}

impl Registry {
    /// Load all collections from `store`, seeding defaults for missing ones.
    pub fn open(store: Store) -> Self {
        let projects = store.load_or_seed(StoreKey::Projects, defaults::projects);
        let verifications = store.load_or_seed(StoreKey::Verifications, defaults::verifications);
        let transactions = store.load_or_seed(StoreKey::Transactions, defaults::transactions);

        let project_ids = IdSequence::seeded_from("p", projects.iter().map(|p| p.id.as_str()));
        let dashboard =
            DashboardView::build(&projects, &verifications, &transactions, DEFAULT_RECENT_LIMIT);
        let (views, _) = watch::channel(RenderedView {
            revision: 0,
            changed: ViewKind::ALL.to_vec(),
            dashboard,
        });

        info!(
            projects = projects.len(),
            verifications = verifications.len(),
            transactions = transactions.len(),
            "Registry loaded"
        );

        Self {
            store,
            projects,
            verifications,
            transactions,
            project_ids,
            clock: Box::new(SystemClock),
            wallet: None,
            recent_limit: DEFAULT_RECENT_LIMIT,
            revision: 0,
            views,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        let dashboard = self.view();
        self.views.send_modify(|rendered| rendered.dashboard = dashboard);
        self
    }

    // === Reads ===

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn verifications(&self) -> &[Verification] {
        &self.verifications
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn wallet(&self) -> Option<&WalletSession> {
        self.wallet.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Derive the dashboard from the current collections
    pub fn view(&self) -> DashboardView {
        DashboardView::build(
            &self.projects,
            &self.verifications,
            &self.transactions,
            self.recent_limit,
        )
    }

    /// Receive a snapshot after every mutation
    pub fn subscribe(&self) -> watch::Receiver<RenderedView> {
        self.views.subscribe()
    }

    // === Mutators ===

    /// Register a project at the front of the listing.
    pub fn register_project(
        &mut self,
        input: NewProject,
    ) -> Result<(Project, MutationReport), RegistryError> {
        input.validate()?;

        let projects = &self.projects;
        let id = self
            .project_ids
            .next_unused(|candidate| projects.iter().any(|p| p.id == candidate));

        let project = Project {
            id,
            name: input.name.trim().to_string(),
            owner: input.owner.trim().to_string(),
            ha: input.ha,
            co2: estimate_co2(input.ha),
            health: DEFAULT_HEALTH,
            status: ProjectStatus::Active,
            coords: [input.lat, input.lon],
            assigned_to: input.assigned_to.filter(|s| !s.trim().is_empty()),
            description: input.description.filter(|s| !s.trim().is_empty()),
        };

        self.projects.insert(0, project.clone());
        let mut persisted = self.persist(StoreKey::Projects);

        let (tx, tx_persisted) =
            self.log_transaction(actions::ADD_PROJECT, &project.id, project.co2);
        persisted &= tx_persisted;

        info!(id = %project.id, name = %project.name, ha = project.ha, "Project registered");

        let revision = self.render(PROJECT_VIEWS);
        let report = MutationReport {
            message: format!("Project \"{}\" saved", project.name),
            transaction: Some(tx),
            persisted,
            revision,
        };
        Ok((project, report))
    }

    /// Delete a project after confirmation.
    ///
    /// An unknown id is a no-op: nothing is written or logged.
    pub fn delete_project(
        &mut self,
        id: &str,
        confirm: impl Confirm,
    ) -> Result<MutationReport, RegistryError> {
        let index = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| RegistryError::NotFound(format!("project {}", id)))?;

        let prompt = format!("Delete project \"{}\"?", self.projects[index].name);
        if !confirm.confirm(&prompt) {
            return Err(RegistryError::Cancelled(prompt));
        }

        let removed = self.projects.remove(index);
        let mut persisted = self.persist(StoreKey::Projects);

        let (tx, tx_persisted) = self.log_transaction(actions::DELETE_PROJECT, &removed.name, 0.0);
        persisted &= tx_persisted;

        info!(id = %removed.id, name = %removed.name, "Project deleted");

        let revision = self.render(PROJECT_VIEWS);
        Ok(MutationReport {
            message: format!("Project \"{}\" deleted", removed.name),
            transaction: Some(tx),
            persisted,
            revision,
        })
    }

    /// Set the status of every verification filed under `project_name`.
    pub fn update_verification_status(
        &mut self,
        project_name: &str,
        status: VerificationStatus,
    ) -> Result<MutationReport, RegistryError> {
        let mut updated = 0usize;
        for v in self.verifications.iter_mut().filter(|v| v.project == project_name) {
            v.status = status;
            updated += 1;
        }

        if updated == 0 {
            return Err(RegistryError::NotFound(format!(
                "verification for project {}",
                project_name
            )));
        }

        let mut persisted = self.persist(StoreKey::Verifications);

        let action = match status {
            VerificationStatus::Approved => actions::APPROVE_MRV,
            VerificationStatus::RevisionRequired => actions::REQUEST_REVISION,
            VerificationStatus::Pending => actions::REOPEN_MRV,
        };
        let (tx, tx_persisted) = self.log_transaction(action, project_name, 0.0);
        persisted &= tx_persisted;

        info!(project = %project_name, %status, updated, "Verification status updated");

        let revision = self.render(MRV_VIEWS);
        Ok(MutationReport {
            message: format!("Verification for \"{}\" set to \"{}\"", project_name, status),
            transaction: Some(tx),
            persisted,
            revision,
        })
    }

    /// Record an uploaded MRV file as a pending verification.
    pub fn ingest_mrv_upload(
        &mut self,
        upload: MrvUpload,
    ) -> Result<(Verification, MutationReport), RegistryError> {
        let file = upload.file.trim();
        if file.is_empty() {
            return Err(RegistryError::Validation("No file selected".into()));
        }

        let project = upload
            .project
            .filter(|p| !p.trim().is_empty())
            .or_else(|| self.projects.first().map(|p| p.name.clone()))
            .unwrap_or_else(|| FALLBACK_PROJECT.to_string());
        let uploader = upload
            .uploader
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOADER.to_string());

        let verification = Verification {
            project,
            uploader,
            file: file.to_string(),
            status: VerificationStatus::Pending,
        };

        self.verifications.insert(0, verification.clone());
        let mut persisted = self.persist(StoreKey::Verifications);

        let (tx, tx_persisted) =
            self.log_transaction(actions::MRV_UPLOAD, &verification.project, 0.0);
        persisted &= tx_persisted;

        info!(file = %verification.file, project = %verification.project, "MRV file received");

        let revision = self.render(MRV_VIEWS);
        let report = MutationReport {
            message: format!("MRV file received: {}", verification.file),
            transaction: Some(tx),
            persisted,
            revision,
        };
        Ok((verification, report))
    }

    /// Wipe the store and restore the default collections.
    pub fn reset_all(&mut self, confirm: impl Confirm) -> Result<MutationReport, RegistryError> {
        let prompt = "Reset all dashboard data to defaults?";
        if !confirm.confirm(prompt) {
            return Err(RegistryError::Cancelled(prompt.to_string()));
        }

        let mut persisted = self.store.clear().is_ok();

        self.projects = defaults::projects();
        self.verifications = defaults::verifications();
        self.transactions = defaults::transactions();
        self.project_ids =
            IdSequence::seeded_from("p", self.projects.iter().map(|p| p.id.as_str()));

        for key in StoreKey::ALL {
            persisted &= self.persist(key);
        }

        info!("All dashboard data reset to defaults");

        let revision = self.render(ViewKind::ALL);
        Ok(MutationReport {
            message: "All data reset to defaults".to_string(),
            transaction: None,
            persisted,
            revision,
        })
    }

    /// Connect through `provider` and record the connection.
    pub async fn connect_wallet(
        &mut self,
        provider: &dyn WalletProvider,
    ) -> Result<MutationReport, RegistryError> {
        let session = wallet::open_session(provider).await?;
        Ok(self.record_wallet_connection(session))
    }

    /// Record an already-established wallet session.
    ///
    /// Split from `connect_wallet` so callers can run the provider handshake
    /// without holding the registry.
    pub fn record_wallet_connection(&mut self, session: WalletSession) -> MutationReport {
        let (tx, persisted) = self.log_transaction(actions::CONNECT, "-", 0.0);
        let message = format!("Wallet {} connected on {}", session.short_address, session.network);
        self.wallet = Some(session);

        let revision = self.render(&[ViewKind::TxLog, ViewKind::Kpis]);
        MutationReport {
            message,
            transaction: Some(tx),
            persisted,
            revision,
        }
    }

    /// Forget the connected wallet. Returns false if none was connected.
    pub fn disconnect_wallet(&mut self) -> bool {
        let was_connected = self.wallet.take().is_some();
        if was_connected {
            info!("Wallet disconnected");
        }
        was_connected
    }

    // === Internals ===

    fn log_transaction(&mut self, action: &str, project: &str, amount: f64) -> (Transaction, bool) {
        let tx = Transaction {
            hash: transaction_hash(),
            action: action.to_string(),
            project: project.to_string(),
            amount,
            time: self.clock.now(),
        };
        self.transactions.insert(0, tx.clone());
        let persisted = self.persist(StoreKey::Transactions);
        (tx, persisted)
    }

    fn persist(&self, key: StoreKey) -> bool {
        let result = match key {
            StoreKey::Projects => self.store.save(key, &self.projects),
            StoreKey::Verifications => self.store.save(key, &self.verifications),
            StoreKey::Transactions => self.store.save(key, &self.transactions),
        };
        if result.is_err() {
            warn!(key = key.as_str(), "Continuing with session-only state");
        }
        result.is_ok()
    }

    fn render(&mut self, changed: &[ViewKind]) -> u64 {
        self.revision += 1;
        self.views.send_replace(RenderedView {
            revision: self.revision,
            changed: changed.to_vec(),
            dashboard: self.view(),
        });
        self.revision
    }
}
