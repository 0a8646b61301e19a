use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::clearance::commands::{
    DecideClearanceItem, InitiateClearance, RegisterDepartment, RegisterUser,
};
use crate::workflows::clearance::domain::{
    ClearanceItem, ClearanceRequest, Decision, Department, DepartmentId, ItemId, Role,
    StudentLevel, UserId, UserProfile,
};
use crate::workflows::clearance::repository::{ClearanceStore, RepositoryError};
use crate::workflows::clearance::{
    clearance_router, CertificateConfig, ClearanceWorkflow, InMemoryClearanceStore,
    InitiatedClearance,
};

pub(super) type MemoryWorkflow = ClearanceWorkflow<InMemoryClearanceStore>;

/// Three departments (Library, Bursary, Sports), one staff member each, and one student.
pub(super) struct Fixture {
    pub(super) service: Arc<MemoryWorkflow>,
    pub(super) store: Arc<InMemoryClearanceStore>,
    pub(super) departments: Vec<Department>,
    pub(super) staff: Vec<UserProfile>,
    pub(super) student: UserProfile,
}

impl Fixture {
    pub(super) fn router(&self) -> axum::Router {
        clearance_router(self.service.clone())
    }

    pub(super) fn department_id(&self, index: usize) -> DepartmentId {
        self.departments[index].id.clone()
    }

    pub(super) fn initiate(&self) -> InitiatedClearance {
        self.service
            .initiate(InitiateClearance {
                student_id: self.student.id.clone(),
            })
            .expect("initiation succeeds")
    }

    /// The student's item for the department at `index`.
    pub(super) fn item(&self, index: usize) -> ClearanceItem {
        let department = self.department_id(index);
        self.store
            .items_for_student(&self.student.id)
            .expect("items load")
            .into_iter()
            .find(|item| item.department_id == department)
            .expect("item exists for department")
    }

    pub(super) fn item_id(&self, index: usize) -> ItemId {
        self.item(index).id
    }

    pub(super) fn request(&self) -> ClearanceRequest {
        self.store
            .fetch_request(&self.student.id)
            .expect("request loads")
            .expect("request exists")
    }

    /// Decision by the staff member assigned to the department at `index`.
    pub(super) fn decision(
        &self,
        index: usize,
        status: Decision,
        remarks: Option<&str>,
    ) -> DecideClearanceItem {
        decision_by(&self.staff[index], status, remarks)
    }
}

pub(super) fn decision_by(
    staff: &UserProfile,
    status: Decision,
    remarks: Option<&str>,
) -> DecideClearanceItem {
    DecideClearanceItem {
        staff_id: staff.id.clone(),
        department_id: staff.department_id.clone().expect("staff has a department"),
        status,
        remarks: remarks.map(str::to_string),
    }
}

pub(super) fn fixture() -> Fixture {
    let store = Arc::new(InMemoryClearanceStore::default());
    let service = Arc::new(ClearanceWorkflow::new(
        store.clone(),
        CertificateConfig::default(),
    ));

    let departments: Vec<Department> = ["Library", "Bursary", "Sports"]
        .into_iter()
        .enumerate()
        .map(|(order, name)| {
            service
                .register_department(department_command(name, order as i32 + 1))
                .expect("department registers")
        })
        .collect();

    let staff = departments
        .iter()
        .map(|department| {
            let slug = department.name.to_ascii_lowercase();
            service
                .register_user(staff_command(&slug, &department.id))
                .expect("staff registers")
        })
        .collect();

    let student = service
        .register_user(student_command("ada", "UC/2020/001"))
        .expect("student registers");

    Fixture {
        service,
        store,
        departments,
        staff,
        student,
    }
}

pub(super) fn department_command(name: &str, order: i32) -> RegisterDepartment {
    RegisterDepartment {
        name: name.to_string(),
        description: Some(format!("{name} clearance")),
        order,
        requirements: vec!["Return borrowed items".to_string()],
    }
}

pub(super) fn staff_command(slug: &str, department: &DepartmentId) -> RegisterUser {
    RegisterUser {
        email: format!("{slug}.officer@unicross.edu.ng"),
        name: format!("{slug} officer"),
        role: Role::Staff,
        department_id: Some(department.clone()),
        matric_number: None,
        faculty: None,
        department: None,
        level: None,
    }
}

pub(super) fn student_command(slug: &str, matric_number: &str) -> RegisterUser {
    RegisterUser {
        email: format!("{slug}@students.unicross.edu.ng"),
        name: format!("{slug} student"),
        role: Role::Student,
        department_id: None,
        matric_number: Some(matric_number.to_string()),
        faculty: Some("Science".to_string()),
        department: Some("Computer Science".to_string()),
        level: Some(StudentLevel::L400),
    }
}

pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl ClearanceStore for UnavailableStore {
    fn insert_department(&self, _department: Department) -> Result<Department, RepositoryError> {
        offline()
    }

    fn fetch_department(&self, _id: &DepartmentId) -> Result<Option<Department>, RepositoryError> {
        offline()
    }

    fn departments(&self) -> Result<Vec<Department>, RepositoryError> {
        offline()
    }

    fn insert_user(&self, _user: UserProfile) -> Result<UserProfile, RepositoryError> {
        offline()
    }

    fn fetch_user(&self, _id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        offline()
    }

    fn users(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        offline()
    }

    fn fetch_item(&self, _id: &ItemId) -> Result<Option<ClearanceItem>, RepositoryError> {
        offline()
    }

    fn items_for_student(&self, _student: &UserId) -> Result<Vec<ClearanceItem>, RepositoryError> {
        offline()
    }

    fn items_for_department(
        &self,
        _department: &DepartmentId,
    ) -> Result<Vec<ClearanceItem>, RepositoryError> {
        offline()
    }

    fn fetch_request(
        &self,
        _student: &UserId,
    ) -> Result<Option<ClearanceRequest>, RepositoryError> {
        offline()
    }

    fn requests(&self) -> Result<Vec<ClearanceRequest>, RepositoryError> {
        offline()
    }

    fn create_clearance(
        &self,
        _request: ClearanceRequest,
        _items: Vec<ClearanceItem>,
    ) -> Result<ClearanceRequest, RepositoryError> {
        offline()
    }

    fn commit_decision(
        &self,
        _item: ClearanceItem,
        _request: Option<ClearanceRequest>,
    ) -> Result<Option<ClearanceRequest>, RepositoryError> {
        offline()
    }

    fn commit_request(
        &self,
        _request: ClearanceRequest,
    ) -> Result<ClearanceRequest, RepositoryError> {
        offline()
    }
}

pub(super) fn unavailable_service() -> ClearanceWorkflow<UnavailableStore> {
    ClearanceWorkflow::new(Arc::new(UnavailableStore), CertificateConfig::default())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
