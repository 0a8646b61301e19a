use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered users (students, staff, administrators).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for departments in the clearance registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepartmentId(pub String);

/// Identifier wrapper for a single (student, department) clearance item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

/// Identifier wrapper for the per-student clearance request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub String);

macro_rules! display_id {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

display_id!(UserId, DepartmentId, ItemId, RequestId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
    #[default]
    Student,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Student => "student",
        }
    }
}

/// Academic level recorded for students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentLevel {
    #[serde(rename = "100")]
    L100,
    #[serde(rename = "200")]
    L200,
    #[serde(rename = "300")]
    L300,
    #[serde(rename = "400")]
    L400,
    #[serde(rename = "500")]
    L500,
    #[serde(rename = "PG")]
    Postgraduate,
}

/// Student-only attributes; present exactly when the user's role is `Student`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDetails {
    pub matric_number: String,
    pub faculty: String,
    pub department: String,
    pub level: StudentLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Department a staff member decides for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<DepartmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentDetails>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    pub fn student_summary(&self) -> Option<StudentSummary> {
        let details = self.student.as_ref()?;
        Some(StudentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            matric_number: details.matric_number.clone(),
            faculty: details.faculty.clone(),
            department: details.department.clone(),
            level: details.level,
        })
    }
}

/// Public projection of a student shown to department staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub matric_number: String,
    pub faculty: String,
    pub department: String,
    pub level: StudentLevel,
}

/// Organizational unit whose approval every clearance request needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: i32,
    pub requirements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Individual department decision state for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Approved,
    Rejected,
}

impl ItemStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Outcome a department may record; items never move back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub const fn item_status(self) -> ItemStatus {
        match self {
            Self::Approved => ItemStatus::Approved,
            Self::Rejected => ItemStatus::Rejected,
        }
    }

    pub const fn label(self) -> &'static str {
        self.item_status().label()
    }
}

/// One department's evaluation of one student. Unique per (student, department).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceItem {
    pub id: ItemId,
    pub student_id: UserId,
    pub department_id: DepartmentId,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClearanceItem {
    pub fn pending(
        id: ItemId,
        student_id: UserId,
        department_id: DepartmentId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            department_id,
            status: ItemStatus::Pending,
            remarks: None,
            approved_by: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records a department decision. Re-deciding is allowed; the item never returns to pending.
    pub fn decide(
        &mut self,
        decision: Decision,
        approver: UserId,
        remarks: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = decision.item_status();
        self.remarks = remarks;
        self.approved_by = Some(approver);
        self.decided_at = Some(now);
        self.updated_at = now;
    }
}

/// Aggregate status of a clearance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    /// Never produced: requests are created directly as `InProgress`.
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

/// Derives the aggregate status from the three department lists.
///
/// Any undecided department keeps the request in progress; once everything is decided
/// the request is completed only if nothing was rejected.
pub fn derive_status(
    pending: &[DepartmentId],
    _completed: &[DepartmentId],
    rejected: &[DepartmentId],
) -> RequestStatus {
    if !pending.is_empty() {
        RequestStatus::InProgress
    } else if rejected.is_empty() {
        RequestStatus::Completed
    } else {
        RequestStatus::Rejected
    }
}

/// Ways the three department lists can fail to partition a department set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionViolation {
    #[error("department {0} appears more than once across the request lists")]
    Duplicate(DepartmentId),
    #[error("department {0} is missing from the request lists")]
    Missing(DepartmentId),
    #[error("department {0} is tracked by the request but not expected")]
    Unexpected(DepartmentId),
}

/// Per-student aggregate view across every department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceRequest {
    pub id: RequestId,
    pub student_id: UserId,
    pub status: RequestStatus,
    pub pending_departments: Vec<DepartmentId>,
    pub completed_departments: Vec<DepartmentId>,
    pub rejected_departments: Vec<DepartmentId>,
    pub certificate_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped by the store on every accepted write.
    pub version: u64,
}

impl ClearanceRequest {
    pub fn open(
        id: RequestId,
        student_id: UserId,
        departments: &[DepartmentId],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            status: RequestStatus::InProgress,
            pending_departments: departments.to_vec(),
            completed_departments: Vec::new(),
            rejected_departments: Vec::new(),
            certificate_generated: false,
            certificate_url: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: 0,
        }
    }

    /// Moves `department` into the list matching `decision` and re-derives the status.
    ///
    /// The department leaves `pending` unconditionally and leaves the opposite outcome list,
    /// so flipping an earlier decision never leaves it in two lists. Lists are kept in
    /// `registry_order`; ids unknown to the registry keep their relative order at the end.
    /// A request that is no longer completed loses any certificate issued earlier.
    pub fn record_decision(
        &mut self,
        department: &DepartmentId,
        decision: Decision,
        registry_order: &[DepartmentId],
    ) {
        self.pending_departments.retain(|id| id != department);

        let (target, other) = match decision {
            Decision::Approved => (
                &mut self.completed_departments,
                &mut self.rejected_departments,
            ),
            Decision::Rejected => (
                &mut self.rejected_departments,
                &mut self.completed_departments,
            ),
        };
        other.retain(|id| id != department);
        if !target.contains(department) {
            target.push(department.clone());
        }

        for list in [
            &mut self.pending_departments,
            &mut self.completed_departments,
            &mut self.rejected_departments,
        ] {
            list.sort_by_key(|id| {
                registry_order
                    .iter()
                    .position(|candidate| candidate == id)
                    .unwrap_or(usize::MAX)
            });
        }

        self.status = self.derived_status();
        if self.status != RequestStatus::Completed {
            self.certificate_generated = false;
            self.certificate_url = None;
            self.completed_at = None;
        }
    }

    pub fn derived_status(&self) -> RequestStatus {
        derive_status(
            &self.pending_departments,
            &self.completed_departments,
            &self.rejected_departments,
        )
    }

    /// Checks that the three lists exactly partition `expected`.
    pub fn check_partition(&self, expected: &[DepartmentId]) -> Result<(), PartitionViolation> {
        let mut seen: Vec<&DepartmentId> = Vec::with_capacity(expected.len());
        for id in self
            .pending_departments
            .iter()
            .chain(&self.completed_departments)
            .chain(&self.rejected_departments)
        {
            if seen.contains(&id) {
                return Err(PartitionViolation::Duplicate(id.clone()));
            }
            if !expected.contains(id) {
                return Err(PartitionViolation::Unexpected(id.clone()));
            }
            seen.push(id);
        }

        match expected.iter().find(|id| !seen.contains(id)) {
            Some(missing) => Err(PartitionViolation::Missing(missing.clone())),
            None => Ok(()),
        }
    }

    /// True when the department lists and status match between two snapshots.
    pub fn same_progress(&self, other: &Self) -> bool {
        self.status == other.status
            && self.pending_departments == other.pending_departments
            && self.completed_departments == other.completed_departments
            && self.rejected_departments == other.rejected_departments
    }
}
