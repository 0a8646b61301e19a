use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    ClearanceItem, ClearanceRequest, Department, DepartmentId, ItemStatus, RequestStatus, Role,
    StudentSummary, UserId, UserProfile,
};

const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Result of initiating a clearance: the request and one pending item per department.
#[derive(Debug, Clone, Serialize)]
pub struct InitiatedClearance {
    pub request: ClearanceRequest,
    pub items: Vec<ClearanceItem>,
}

/// Item and request as persisted after a department decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub item: ClearanceItem,
    pub request: ClearanceRequest,
}

/// Everything a student needs to follow their clearance.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedClearance {
    pub request: ClearanceRequest,
    pub items: Vec<ClearanceItem>,
    pub departments: Vec<Department>,
}

/// Item paired with the student it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct ItemWithStudent {
    pub item: ClearanceItem,
    pub student: StudentSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestListing {
    pub request: ClearanceRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListing {
    #[serde(flatten)]
    pub user: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserCounts {
    pub total: usize,
    pub students: usize,
    pub staff: usize,
    pub admins: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestCounts {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentStats {
    pub department_id: DepartmentId,
    pub name: String,
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentActivity {
    pub student_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matric_number: Option<String>,
    pub status: RequestStatus,
    pub updated_at: DateTime<Utc>,
}

/// Dashboard counters; pure aggregation over the stored collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub users: UserCounts,
    pub departments: usize,
    pub clearances: RequestCounts,
    pub department_stats: Vec<DepartmentStats>,
    pub recent_activity: Vec<RecentActivity>,
}

impl SummaryCounts {
    pub fn compute(
        users: &[UserProfile],
        departments: &[Department],
        items: &[ClearanceItem],
        requests: &[ClearanceRequest],
    ) -> Self {
        let mut user_counts = UserCounts {
            total: users.len(),
            ..UserCounts::default()
        };
        for user in users {
            match user.role {
                Role::Student => user_counts.students += 1,
                Role::Staff => user_counts.staff += 1,
                Role::Admin => user_counts.admins += 1,
            }
        }

        let mut clearances = RequestCounts {
            total: requests.len(),
            ..RequestCounts::default()
        };
        for request in requests {
            match request.status {
                RequestStatus::Completed => clearances.completed += 1,
                RequestStatus::InProgress => clearances.in_progress += 1,
                RequestStatus::Rejected => clearances.rejected += 1,
                RequestStatus::Pending => {}
            }
        }

        let department_stats = departments
            .iter()
            .map(|department| {
                let owned: Vec<&ClearanceItem> = items
                    .iter()
                    .filter(|item| item.department_id == department.id)
                    .collect();
                let count =
                    |status: ItemStatus| owned.iter().filter(|item| item.status == status).count();
                DepartmentStats {
                    department_id: department.id.clone(),
                    name: department.name.clone(),
                    total: owned.len(),
                    approved: count(ItemStatus::Approved),
                    rejected: count(ItemStatus::Rejected),
                    pending: count(ItemStatus::Pending),
                }
            })
            .collect();

        let by_id: HashMap<&UserId, &UserProfile> =
            users.iter().map(|user| (&user.id, user)).collect();
        let mut recent: Vec<&ClearanceRequest> = requests.iter().collect();
        recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let recent_activity = recent
            .into_iter()
            .take(RECENT_ACTIVITY_LIMIT)
            .map(|request| {
                let student = by_id.get(&request.student_id);
                RecentActivity {
                    student_id: request.student_id.clone(),
                    student_name: student.map(|user| user.name.clone()),
                    matric_number: student
                        .and_then(|user| user.student.as_ref())
                        .map(|details| details.matric_number.clone()),
                    status: request.status,
                    updated_at: request.updated_at,
                }
            })
            .collect();

        Self {
            users: user_counts,
            departments: departments.len(),
            clearances,
            department_stats,
            recent_activity,
        }
    }
}
