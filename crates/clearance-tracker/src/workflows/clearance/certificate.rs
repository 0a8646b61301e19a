use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ClearanceItem, DepartmentId, ItemStatus, UserId};

pub const DEFAULT_CERTIFICATE_PATH: &str = "/certificates";

/// Controls where issued certificates are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateConfig {
    base_path: String,
}

impl CertificateConfig {
    /// Returns `None` when `base_path` is not an absolute path below the root.
    pub fn new(base_path: impl Into<String>) -> Option<Self> {
        let raw = base_path.into();
        let trimmed = raw.trim().trim_end_matches('/');
        if !trimmed.starts_with('/') || trimmed.len() < 2 {
            return None;
        }

        Some(Self {
            base_path: trimmed.to_string(),
        })
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn locator_for(&self, student: &UserId) -> String {
        format!("{}/{}.pdf", self.base_path, student)
    }
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_CERTIFICATE_PATH.to_string(),
        }
    }
}

/// Issued certificate handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Certificate {
    pub student_id: UserId,
    pub certificate_url: String,
    pub issued_at: DateTime<Utc>,
}

/// Reasons a certificate cannot be issued from the item detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateBlock {
    CountMismatch { items: usize, departments: usize },
    Undecided(Vec<DepartmentId>),
    Rejected(Vec<DepartmentId>),
}

impl CertificateBlock {
    pub fn describe(&self) -> String {
        match self {
            Self::CountMismatch { items, departments } => format!(
                "clearance covers {items} departments but {departments} are registered"
            ),
            Self::Undecided(ids) => format!(
                "clearance not approved by all departments; awaiting {}",
                join_ids(ids)
            ),
            Self::Rejected(ids) => format!(
                "clearance not approved by all departments; rejected by {}",
                join_ids(ids)
            ),
        }
    }
}

fn join_ids(ids: &[DepartmentId]) -> String {
    ids.iter()
        .map(|id| id.0.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Checks the item detail directly instead of trusting the aggregate status.
///
/// The item count must match the registry so a department added after initiation blocks
/// issuance; rejections are reported ahead of undecided departments.
pub fn certificate_gate(
    items: &[ClearanceItem],
    registered_departments: usize,
) -> Result<(), CertificateBlock> {
    if items.len() != registered_departments {
        return Err(CertificateBlock::CountMismatch {
            items: items.len(),
            departments: registered_departments,
        });
    }

    let with_status = |status: ItemStatus| -> Vec<DepartmentId> {
        items
            .iter()
            .filter(|item| item.status == status)
            .map(|item| item.department_id.clone())
            .collect()
    };

    let rejected = with_status(ItemStatus::Rejected);
    if !rejected.is_empty() {
        return Err(CertificateBlock::Rejected(rejected));
    }

    let undecided = with_status(ItemStatus::Pending);
    if !undecided.is_empty() {
        return Err(CertificateBlock::Undecided(undecided));
    }

    Ok(())
}
