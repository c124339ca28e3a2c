//! Record types for the three dashboard collections
//!
//! Field names follow the JSON shapes the dashboard front-end reads, so a
//! persisted collection can be handed to the browser unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tonnes of CO₂ credited per hectare of registered habitat
pub const CO2_PER_HECTARE: f64 = 3.5;

/// Health score assigned to freshly registered projects
pub const DEFAULT_HEALTH: u8 = 85;

/// Lifecycle status of a project
///
/// `Active` and `Pending` are the values the dashboard assigns; anything else
/// round-trips untouched as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectStatus {
    Active,
    Pending,
    Other(String),
}

impl ProjectStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Pending => "Pending",
            Self::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<String> for ProjectStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Active" => Self::Active,
            "Pending" => Self::Pending,
            _ => Self::Other(s),
        }
    }
}

impl From<ProjectStatus> for String {
    fn from(status: ProjectStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered restoration site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Stable identifier (`p1`, `p2`, ...)
    pub id: String,
    pub name: String,
    pub owner: String,
    /// Area in hectares
    pub ha: f64,
    /// Estimated tonnes of CO₂ sequestered
    pub co2: f64,
    /// Health score, 0-100
    pub health: u8,
    pub status: ProjectStatus,
    /// `[latitude, longitude]`
    pub coords: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// CO₂ estimate for a site of the given area
pub fn estimate_co2(ha: f64) -> f64 {
    (ha * CO2_PER_HECTARE).round()
}

/// Review state of an MRV submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Pending,
    Approved,
    #[serde(rename = "Revision required")]
    RevisionRequired,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::RevisionRequired => "Revision required",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded MRV evidence file awaiting or past review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// Project display name (matched by name, not id)
    pub project: String,
    pub uploader: String,
    pub file: String,
    pub status: VerificationStatus,
}

/// Append-only activity log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub action: String,
    /// Project id or name the action refers to, `-` when none
    pub project: String,
    pub amount: f64,
    /// `YYYY-MM-DD HH:MM`
    pub time: String,
}

/// Transaction action labels written by the mutators
pub mod actions {
    pub const MINT: &str = "Mint";
    pub const TRANSFER: &str = "Transfer";
    pub const CONNECT: &str = "Connect";
    pub const ADD_PROJECT: &str = "Add Project";
    pub const DELETE_PROJECT: &str = "Delete Project";
    pub const MRV_UPLOAD: &str = "MRV Upload";
    pub const APPROVE_MRV: &str = "Approve MRV";
    pub const REQUEST_REVISION: &str = "Request Revision";
    pub const REOPEN_MRV: &str = "Reopen MRV";
}

/// Seed collections used on first load and after a reset
pub mod defaults {
    use super::*;

    #[rustfmt::skip]
    pub fn projects() -> Vec<Project> {
        vec![
            seed_project("p1", "Sundarbans Mangrove", "NGO A", 1200.0, 5200.0, 82, ProjectStatus::Active, [22.05, 88.66]),
            seed_project("p2", "Seagrass Bay", "Community X", 450.0, 2300.0, 70, ProjectStatus::Active, [12.34, 80.22]),
            seed_project("p3", "Coral Reef Restore", "Gov Unit", 300.0, 1200.0, 60, ProjectStatus::Pending, [10.12, 124.56]),
        ]
    }

    pub fn verifications() -> Vec<Verification> {
        vec![
            Verification {
                project: "Coral Reef Restore".to_string(),
                uploader: "Dr. P".to_string(),
                file: "reef_mrv_2025.csv".to_string(),
                status: VerificationStatus::Pending,
            },
            Verification {
                project: "Seagrass Bay".to_string(),
                uploader: "Community X".to_string(),
                file: "seagrass_2025.xlsx".to_string(),
                status: VerificationStatus::Pending,
            },
        ]
    }

    pub fn transactions() -> Vec<Transaction> {
        vec![
            Transaction {
                hash: "0xabc123def".to_string(),
                action: actions::MINT.to_string(),
                project: "p1".to_string(),
                amount: 1000.0,
                time: "2025-09-12 10:12".to_string(),
            },
            Transaction {
                hash: "0xdef456ghi".to_string(),
                action: actions::TRANSFER.to_string(),
                project: "p2".to_string(),
                amount: 300.0,
                time: "2025-09-13 14:03".to_string(),
            },
        ]
    }

    #[allow(clippy::too_many_arguments)]
    fn seed_project(
        id: &str,
        name: &str,
        owner: &str,
        ha: f64,
        co2: f64,
        health: u8,
        status: ProjectStatus,
        coords: [f64; 2],
    ) -> Project {
        Project {
            id: id.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
            ha,
            co2,
            health,
            status,
            coords,
            assigned_to: None,
            description: None,
        }
    }
}
