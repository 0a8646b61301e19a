use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::certificate::{certificate_gate, Certificate, CertificateBlock, CertificateConfig};
use super::commands::{
    non_blank, normalize_email, DecideClearanceItem, InitiateClearance, RegisterDepartment,
    RegisterUser,
};
use super::domain::{
    ClearanceItem, ClearanceRequest, Decision, Department, DepartmentId, ItemId, ItemStatus,
    RequestId, RequestStatus, Role, StudentDetails, UserId, UserProfile,
};
use super::locks::StudentLocks;
use super::report::{
    DecisionOutcome, InitiatedClearance, ItemWithStudent, RequestListing, SummaryCounts,
    TrackedClearance, UserListing,
};
use super::repository::{ClearanceStore, RepositoryError};

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_record_id(prefix: &str) -> String {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

/// Workflow engine applying clearance operations against a store.
pub struct ClearanceWorkflow<S> {
    store: Arc<S>,
    locks: StudentLocks,
    certificates: CertificateConfig,
}

impl<S> ClearanceWorkflow<S>
where
    S: ClearanceStore + 'static,
{
    pub fn new(store: Arc<S>, certificates: CertificateConfig) -> Self {
        Self {
            store,
            locks: StudentLocks::default(),
            certificates,
        }
    }

    /// Register a department in the clearance registry.
    pub fn register_department(
        &self,
        command: RegisterDepartment,
    ) -> Result<Department, ClearanceError> {
        let name = non_blank(Some(command.name.as_str()))
            .ok_or_else(|| ClearanceError::Validation("department name is required".into()))?;

        let department = Department {
            id: DepartmentId(next_record_id("dept")),
            name,
            description: non_blank(command.description.as_deref()),
            order: command.order,
            requirements: command
                .requirements
                .iter()
                .filter_map(|requirement| non_blank(Some(requirement.as_str())))
                .collect(),
            staff_id: None,
            created_at: Utc::now(),
        };

        let stored = self.store.insert_department(department)?;
        info!(department = %stored.id, name = %stored.name, "department registered");
        Ok(stored)
    }

    /// The registry in evaluation order, each department carrying its first registered staff member.
    pub fn departments(&self) -> Result<Vec<Department>, ClearanceError> {
        let mut departments = self.store.departments()?;
        let staff: Vec<UserProfile> = self
            .store
            .users()?
            .into_iter()
            .filter(UserProfile::is_staff)
            .collect();

        for department in &mut departments {
            department.staff_id = staff
                .iter()
                .filter(|user| user.department_id.as_ref() == Some(&department.id))
                .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
                .map(|user| user.id.clone());
        }
        Ok(departments)
    }

    /// Register a student, staff member, or administrator.
    pub fn register_user(&self, command: RegisterUser) -> Result<UserProfile, ClearanceError> {
        let email = normalize_email(&command.email)
            .ok_or_else(|| ClearanceError::Validation("a valid email address is required".into()))?;
        let name = non_blank(Some(command.name.as_str()))
            .ok_or_else(|| ClearanceError::Validation("name is required".into()))?;

        let (department_id, student) = match command.role {
            Role::Student => {
                let details = match (
                    non_blank(command.matric_number.as_deref()),
                    non_blank(command.faculty.as_deref()),
                    non_blank(command.department.as_deref()),
                    command.level,
                ) {
                    (Some(matric_number), Some(faculty), Some(department), Some(level)) => {
                        StudentDetails {
                            matric_number,
                            faculty,
                            department,
                            level,
                        }
                    }
                    _ => {
                        return Err(ClearanceError::Validation(
                            "matric number, faculty, department, and level are required for students"
                                .into(),
                        ))
                    }
                };
                (None, Some(details))
            }
            Role::Staff => {
                let department_id = command.department_id.ok_or_else(|| {
                    ClearanceError::Validation("department is required for staff".into())
                })?;
                if self.store.fetch_department(&department_id)?.is_none() {
                    return Err(ClearanceError::Validation(format!(
                        "invalid department id {department_id}"
                    )));
                }
                (Some(department_id), None)
            }
            Role::Admin => (None, None),
        };

        let user = UserProfile {
            id: UserId(next_record_id("usr")),
            email,
            name,
            role: command.role,
            department_id,
            student,
            created_at: Utc::now(),
        };

        let stored = self.store.insert_user(user)?;
        info!(user = %stored.id, role = stored.role.label(), "user registered");
        Ok(stored)
    }

    /// Users sorted by role then name; staff carry their department's name.
    pub fn users(&self) -> Result<Vec<UserListing>, ClearanceError> {
        let departments = self.store.departments()?;
        let mut users = self.store.users()?;
        users.sort_by(|a, b| a.role.cmp(&b.role).then_with(|| a.name.cmp(&b.name)));

        Ok(users
            .into_iter()
            .map(|user| {
                let department_name = user.department_id.as_ref().map(|id| {
                    departments
                        .iter()
                        .find(|dept| &dept.id == id)
                        .map(|dept| dept.name.clone())
                        .unwrap_or_else(|| "Unknown Department".to_string())
                });
                UserListing {
                    user,
                    department_name,
                }
            })
            .collect())
    }

    /// Open a clearance request with one pending item per registered department.
    pub fn initiate(
        &self,
        command: InitiateClearance,
    ) -> Result<InitiatedClearance, ClearanceError> {
        let student = self.require_student(&command.student_id)?;

        self.locks.run(&student.id, || -> Result<_, ClearanceError> {
            if self.store.fetch_request(&student.id)?.is_some() {
                return Err(ClearanceError::Conflict(
                    "clearance request already exists".into(),
                ));
            }

            let departments = self.store.departments()?;
            if departments.is_empty() {
                return Err(ClearanceError::Precondition(
                    "no departments are registered".into(),
                ));
            }

            let now = Utc::now();
            let department_ids: Vec<DepartmentId> =
                departments.iter().map(|dept| dept.id.clone()).collect();
            let request = ClearanceRequest::open(
                RequestId(next_record_id("req")),
                student.id.clone(),
                &department_ids,
                now,
            );
            let items: Vec<ClearanceItem> = department_ids
                .iter()
                .map(|department| {
                    ClearanceItem::pending(
                        ItemId(next_record_id("clr")),
                        student.id.clone(),
                        department.clone(),
                        now,
                    )
                })
                .collect();

            let request = self.store.create_clearance(request, items.clone())?;
            info!(
                student = %student.id,
                departments = items.len(),
                "clearance request initiated"
            );
            Ok(InitiatedClearance { request, items })
        })
    }

    /// Apply a department decision to an item and recompute the student's request.
    pub fn decide(
        &self,
        item_id: &ItemId,
        command: DecideClearanceItem,
    ) -> Result<DecisionOutcome, ClearanceError> {
        let DecideClearanceItem {
            staff_id,
            department_id,
            status: decision,
            remarks,
        } = command;

        let staff = self
            .store
            .fetch_user(&staff_id)?
            .ok_or_else(|| ClearanceError::NotFound(format!("staff {staff_id} not found")))?;
        if !staff.is_staff() {
            warn!(user = %staff_id, "non-staff user attempted a clearance decision");
            return Err(ClearanceError::Authorization(format!(
                "user {staff_id} is not a staff member"
            )));
        }

        if self.store.fetch_department(&department_id)?.is_none() {
            return Err(ClearanceError::NotFound(format!(
                "department {department_id} not found"
            )));
        }
        if staff.department_id.as_ref() != Some(&department_id) {
            warn!(staff = %staff_id, department = %department_id, "staff acted outside assigned department");
            return Err(ClearanceError::Authorization(
                "staff not authorized for this department".into(),
            ));
        }

        let remarks = non_blank(remarks.as_deref());
        if decision == Decision::Rejected && remarks.is_none() {
            return Err(ClearanceError::Validation(
                "remarks are required for rejection".into(),
            ));
        }

        let student_id = self
            .store
            .fetch_item(item_id)?
            .ok_or_else(|| ClearanceError::NotFound(format!("clearance item {item_id} not found")))?
            .student_id;

        self.locks.run(&student_id, || -> Result<_, ClearanceError> {
            let mut item = self.store.fetch_item(item_id)?.ok_or_else(|| {
                ClearanceError::NotFound(format!("clearance item {item_id} not found"))
            })?;
            if item.department_id != department_id {
                warn!(item = %item_id, department = %department_id, "decision targeted another department's item");
                return Err(ClearanceError::Authorization(
                    "clearance item does not belong to this department".into(),
                ));
            }

            let current = self.store.fetch_request(&student_id)?.ok_or_else(|| {
                ClearanceError::NotFound(format!(
                    "clearance request for student {student_id} not found"
                ))
            })?;

            let registry: Vec<DepartmentId> = self
                .store
                .departments()?
                .into_iter()
                .map(|dept| dept.id)
                .collect();

            let now = Utc::now();
            item.decide(decision, staff.id.clone(), remarks, now);

            let mut next = current.clone();
            next.record_decision(&department_id, decision, &registry);
            let expected: Vec<DepartmentId> = self
                .store
                .items_for_student(&student_id)?
                .into_iter()
                .map(|item| item.department_id)
                .collect();
            if let Err(violation) = next.check_partition(&expected) {
                warn!(student = %student_id, %violation, "clearance request drifted from its items");
                return Err(ClearanceError::Precondition(violation.to_string()));
            }

            let request = if next.same_progress(&current) {
                debug!(student = %student_id, department = %department_id, "request unchanged by decision");
                self.store.commit_decision(item.clone(), None)?;
                current
            } else {
                next.updated_at = now;
                self.store
                    .commit_decision(item.clone(), Some(next))?
                    .ok_or(RepositoryError::NotFound)?
            };

            info!(
                student = %student_id,
                department = %department_id,
                decision = decision.label(),
                status = request.status.label(),
                "clearance decision recorded"
            );
            Ok(DecisionOutcome { item, request })
        })
    }

    /// Read-only view of a student's request, items, and the department registry.
    pub fn track(&self, student_id: &UserId) -> Result<TrackedClearance, ClearanceError> {
        let student = self.require_student(student_id)?;
        let request = self.require_request(&student.id)?;
        let items = self.store.items_for_student(&student.id)?;
        let departments = self.departments()?;

        Ok(TrackedClearance {
            request,
            items,
            departments,
        })
    }

    pub fn item_detail(&self, item_id: &ItemId) -> Result<ItemWithStudent, ClearanceError> {
        let item = self
            .store
            .fetch_item(item_id)?
            .ok_or_else(|| ClearanceError::NotFound(format!("clearance item {item_id} not found")))?;
        let student = self
            .store
            .fetch_user(&item.student_id)?
            .and_then(|user| user.student_summary())
            .ok_or_else(|| {
                ClearanceError::NotFound(format!("student {} not found", item.student_id))
            })?;

        Ok(ItemWithStudent { item, student })
    }

    /// Pending items awaiting a decision from `department_id`, with student summaries.
    pub fn pending_for_department(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Vec<ItemWithStudent>, ClearanceError> {
        if self.store.fetch_department(department_id)?.is_none() {
            return Err(ClearanceError::NotFound(format!(
                "department {department_id} not found"
            )));
        }

        let mut pending = Vec::new();
        for item in self.store.items_for_department(department_id)? {
            if item.status != ItemStatus::Pending {
                continue;
            }
            match self
                .store
                .fetch_user(&item.student_id)?
                .and_then(|user| user.student_summary())
            {
                Some(student) => pending.push(ItemWithStudent { item, student }),
                None => warn!(item = %item.id, "pending item references a missing student"),
            }
        }
        Ok(pending)
    }

    /// All requests, newest first, joined with their students.
    pub fn requests(&self) -> Result<Vec<RequestListing>, ClearanceError> {
        let mut requests = self.store.requests()?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        requests
            .into_iter()
            .map(|request| {
                let student = self
                    .store
                    .fetch_user(&request.student_id)?
                    .and_then(|user| user.student_summary());
                Ok(RequestListing { request, student })
            })
            .collect()
    }

    /// Issue the certificate once every department item is approved.
    pub fn issue_certificate(&self, student_id: &UserId) -> Result<Certificate, ClearanceError> {
        let student = self.require_student(student_id)?;

        self.locks.run(&student.id, || -> Result<_, ClearanceError> {
            let request = self.require_request(&student.id)?;
            let items = self.store.items_for_student(&student.id)?;
            let registered = self.store.departments()?.len();

            if let Err(block) = certificate_gate(&items, registered) {
                warn!(student = %student.id, reason = %block.describe(), "certificate blocked");
                return Err(match block {
                    CertificateBlock::CountMismatch { .. } => {
                        ClearanceError::Precondition(block.describe())
                    }
                    CertificateBlock::Undecided(_) | CertificateBlock::Rejected(_) => {
                        ClearanceError::Incomplete(block.describe())
                    }
                });
            }

            if let (true, Some(url), Some(issued_at)) = (
                request.certificate_generated,
                request.certificate_url.clone(),
                request.completed_at,
            ) {
                debug!(student = %student.id, "certificate already issued");
                return Ok(Certificate {
                    student_id: student.id.clone(),
                    certificate_url: url,
                    issued_at,
                });
            }

            let now = Utc::now();
            let mut request = request;
            let certificate_url = self.certificates.locator_for(&student.id);
            request.certificate_generated = true;
            request.certificate_url = Some(certificate_url.clone());
            request.status = RequestStatus::Completed;
            request.completed_at = Some(now);
            request.updated_at = now;
            self.store.commit_request(request)?;

            info!(student = %student.id, url = %certificate_url, "clearance certificate issued");
            Ok(Certificate {
                student_id: student.id.clone(),
                certificate_url,
                issued_at: now,
            })
        })
    }

    pub fn summary(&self) -> Result<SummaryCounts, ClearanceError> {
        let users = self.store.users()?;
        let departments = self.store.departments()?;
        let requests = self.store.requests()?;
        let mut items = Vec::new();
        for department in &departments {
            items.extend(self.store.items_for_department(&department.id)?);
        }

        Ok(SummaryCounts::compute(
            &users,
            &departments,
            &items,
            &requests,
        ))
    }

    fn require_student(&self, student_id: &UserId) -> Result<UserProfile, ClearanceError> {
        match self.store.fetch_user(student_id)? {
            Some(user) if user.is_student() => Ok(user),
            _ => Err(ClearanceError::Validation(format!(
                "invalid student id {student_id}"
            ))),
        }
    }

    fn require_request(&self, student_id: &UserId) -> Result<ClearanceRequest, ClearanceError> {
        self.store.fetch_request(student_id)?.ok_or_else(|| {
            ClearanceError::NotFound(format!("no clearance request found for {student_id}"))
        })
    }
}

/// Error raised by the clearance workflow.
#[derive(Debug, thiserror::Error)]
pub enum ClearanceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    Precondition(String),
    #[error("{0}")]
    Incomplete(String),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl ClearanceError {
    /// Stable machine-readable error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Authorization(_) => "authorization",
            Self::Precondition(_) => "precondition",
            Self::Incomplete(_) => "incomplete",
            Self::Repository(_) => "internal",
        }
    }
}

impl From<RepositoryError> for ClearanceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(what) => Self::Conflict(format!("{what} already exists")),
            RepositoryError::StaleWrite { .. } => Self::Conflict(format!(
                "{value}; reload the clearance request and resubmit"
            )),
            RepositoryError::NotFound => Self::NotFound("record not found".into()),
            RepositoryError::Unavailable(_) => Self::Repository(value),
        }
    }
}
