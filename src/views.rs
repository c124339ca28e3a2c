//! View synchronizer
//!
//! Pure read-side derivations over the current collections. Everything here
//! borrows, nothing mutates, so any of it can be re-run after a mutation or on
//! demand without side effects.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Project, Transaction, Verification, VerificationStatus, actions};

/// Number of entries shown in the recent-activity panel
pub const DEFAULT_RECENT_LIMIT: usize = 6;

/// Initial map viewport (latitude, longitude) and zoom
pub const MAP_DEFAULT_CENTER: [f64; 2] = [20.6, 78.9];
pub const MAP_DEFAULT_ZOOM: u8 = 5;

/// Headline counters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_projects: usize,
    /// Projects shown on the "registered" tab
    pub registered_projects: usize,
    pub total_co2: f64,
    /// Mean health rounded to the nearest integer, 0 when there are no projects
    pub avg_health: u32,
}

pub fn kpis(projects: &[Project]) -> Kpis {
    let total_co2 = projects.iter().map(|p| p.co2).sum();
    let health_sum: u32 = projects.iter().map(|p| u32::from(p.health)).sum();
    let avg_health = if projects.is_empty() {
        0
    } else {
        (f64::from(health_sum) / projects.len() as f64).round() as u32
    };

    Kpis {
        total_projects: projects.len(),
        registered_projects: projects.iter().filter(|p| p.status.is_active()).count(),
        total_co2,
        avg_health,
    }
}

/// Tabs on the projects page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectTab {
    /// Active projects
    #[default]
    Registered,
    /// Everything not active
    Managed,
    All,
}

impl FromStr for ProjectTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(Self::Registered),
            "managed" => Ok(Self::Managed),
            "all" => Ok(Self::All),
            other => Err(format!("unknown project tab: {}", other)),
        }
    }
}

pub fn projects_for_tab(projects: &[Project], tab: ProjectTab) -> Vec<&Project> {
    projects
        .iter()
        .filter(|p| match tab {
            ProjectTab::Registered => p.status.is_active(),
            ProjectTab::Managed => !p.status.is_active(),
            ProjectTab::All => true,
        })
        .collect()
}

pub fn find_project<'a>(projects: &'a [Project], id: &str) -> Option<&'a Project> {
    projects.iter().find(|p| p.id == id)
}

pub fn find_project_by_name<'a>(projects: &'a [Project], name: &str) -> Option<&'a Project> {
    projects.iter().find(|p| p.name == name)
}

/// The newest `limit` transactions, newest first
pub fn recent_transactions(transactions: &[Transaction], limit: usize) -> &[Transaction] {
    &transactions[..limit.min(transactions.len())]
}

/// One-line rendering used by the recent-activity panel
pub fn activity_line(tx: &Transaction) -> String {
    format!("{} — {} {} (project {})", tx.time, tx.action, tx.amount, tx.project)
}

pub fn verifications_for_project<'a>(
    verifications: &'a [Verification],
    project_name: &str,
) -> Vec<&'a Verification> {
    verifications
        .iter()
        .filter(|v| v.project == project_name)
        .collect()
}

/// MRV dashboard counters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MrvSummary {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub revision_required: usize,
    /// Time of the most recent upload, from the transaction log
    pub latest_upload: Option<String>,
}

pub fn mrv_summary(verifications: &[Verification], transactions: &[Transaction]) -> MrvSummary {
    let count = |status: VerificationStatus| {
        verifications.iter().filter(|v| v.status == status).count()
    };

    MrvSummary {
        total: verifications.len(),
        pending: count(VerificationStatus::Pending),
        approved: count(VerificationStatus::Approved),
        revision_required: count(VerificationStatus::RevisionRequired),
        latest_upload: transactions
            .iter()
            .find(|tx| tx.action == actions::MRV_UPLOAD)
            .map(|tx| tx.time.clone()),
    }
}

/// A project pin for the map collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub name: String,
    pub coords: [f64; 2],
    pub ha: f64,
}

pub fn map_markers(projects: &[Project]) -> Vec<MapMarker> {
    projects
        .iter()
        .filter(|p| p.coords.iter().all(|c| c.is_finite()))
        .map(|p| MapMarker {
            id: p.id.clone(),
            name: p.name.clone(),
            coords: p.coords,
            ha: p.ha,
        })
        .collect()
}

/// Numeric series for the chart collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

/// Monthly CO₂ sequestration shown on the dashboard chart
pub fn co2_series() -> ChartSeries {
    ChartSeries {
        label: "CO₂ (t)".to_string(),
        labels: ["Jan", "Feb", "Mar", "Apr", "May", "Jun"]
            .iter()
            .map(|m| m.to_string())
            .collect(),
        data: vec![200.0, 300.0, 450.0, 700.0, 900.0, 1200.0],
    }
}

/// `0x1234...abcd` form of a wallet address
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.is_empty() {
        return "—".to_string();
    }
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Views a mutation can invalidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewKind {
    Kpis,
    Projects,
    Verifications,
    Mrv,
    TxLog,
    Map,
}

impl ViewKind {
    pub const ALL: &'static [ViewKind] = &[
        Self::Kpis,
        Self::Projects,
        Self::Verifications,
        Self::Mrv,
        Self::TxLog,
        Self::Map,
    ];
}

/// Everything the dashboard renders, derived in one pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub kpis: Kpis,
    pub recent_activity: Vec<String>,
    pub registered: Vec<Project>,
    pub managed: Vec<Project>,
    pub verifications: Vec<Verification>,
    pub mrv: MrvSummary,
    pub transactions: Vec<Transaction>,
    pub markers: Vec<MapMarker>,
}

impl DashboardView {
    pub fn build(
        projects: &[Project],
        verifications: &[Verification],
        transactions: &[Transaction],
        recent_limit: usize,
    ) -> Self {
        Self {
            kpis: kpis(projects),
            recent_activity: recent_transactions(transactions, recent_limit)
                .iter()
                .map(activity_line)
                .collect(),
            registered: projects_for_tab(projects, ProjectTab::Registered)
                .into_iter()
                .cloned()
                .collect(),
            managed: projects_for_tab(projects, ProjectTab::Managed)
                .into_iter()
                .cloned()
                .collect(),
            verifications: verifications.to_vec(),
            mrv: mrv_summary(verifications, transactions),
            transactions: transactions.to_vec(),
            markers: map_markers(projects),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::defaults;

    #[test]
    fn test_kpis_over_defaults() {
        let k = kpis(&defaults::projects());
        assert_eq!(k.total_projects, 3);
        assert_eq!(k.registered_projects, 2);
        assert_eq!(k.total_co2, 8700.0);
        // (82 + 70 + 60) / 3 = 70.67
        assert_eq!(k.avg_health, 71);
    }

    #[test]
    fn test_kpis_empty_collection() {
        let k = kpis(&[]);
        assert_eq!(k.total_projects, 0);
        assert_eq!(k.avg_health, 0);
        assert_eq!(k.total_co2, 0.0);
    }

    #[test]
    fn test_tabs_partition_projects() {
        let projects = defaults::projects();
        let registered = projects_for_tab(&projects, ProjectTab::Registered);
        let managed = projects_for_tab(&projects, ProjectTab::Managed);

        assert_eq!(registered.len() + managed.len(), projects.len());
        assert!(registered.iter().all(|p| p.status.is_active()));
        assert_eq!(managed[0].name, "Coral Reef Restore");
        assert_eq!(projects_for_tab(&projects, ProjectTab::All).len(), 3);
    }

    #[test]
    fn test_recent_transactions_caps_at_limit() {
        let txs = defaults::transactions();
        assert_eq!(recent_transactions(&txs, 6).len(), 2);
        assert_eq!(recent_transactions(&txs, 1)[0].hash, "0xabc123def");
        assert!(recent_transactions(&txs, 0).is_empty());
    }

    #[test]
    fn test_activity_line_format() {
        let line = activity_line(&defaults::transactions()[0]);
        assert_eq!(line, "2025-09-12 10:12 — Mint 1000 (project p1)");
    }

    #[test]
    fn test_mrv_summary_counts_statuses() {
        let mut verifications = defaults::verifications();
        verifications[0].status = VerificationStatus::Approved;

        let summary = mrv_summary(&verifications, &defaults::transactions());
        assert_eq!(summary.total, 2);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.approved, 1);
        assert!(summary.latest_upload.is_none());
    }

    #[test]
    fn test_shorten_address() {
        assert_eq!(
            shorten_address("0x1234567890abcdef1234567890abcdef12345678"),
            "0x1234...5678"
        );
        assert_eq!(shorten_address(""), "—");
        assert_eq!(shorten_address("0xabc"), "0xabc");
    }

    #[test]
    fn test_tab_parsing() {
        assert_eq!("managed".parse::<ProjectTab>(), Ok(ProjectTab::Managed));
        assert!("archived".parse::<ProjectTab>().is_err());
    }

    #[test]
    fn test_views_do_not_mutate_input() {
        let projects = defaults::projects();
        let verifications = defaults::verifications();
        let txs = defaults::transactions();

        let view = DashboardView::build(&projects, &verifications, &txs, DEFAULT_RECENT_LIMIT);

        assert_eq!(projects, defaults::projects());
        assert_eq!(view.registered.len(), 2);
        assert_eq!(view.markers.len(), 3);
        assert_eq!(view.recent_activity.len(), 2);
    }
}
