use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    ClearanceItem, ClearanceRequest, Department, DepartmentId, ItemId, UserId, UserProfile,
};
use super::repository::{ClearanceStore, RepositoryError};

#[derive(Debug, Default)]
struct StoreState {
    departments: Vec<Department>,
    users: Vec<UserProfile>,
    items: Vec<ClearanceItem>,
    requests: Vec<ClearanceRequest>,
}

impl StoreState {
    fn request_slot(&mut self, request: &ClearanceRequest) -> Result<usize, RepositoryError> {
        let index = self
            .requests
            .iter()
            .position(|stored| stored.student_id == request.student_id)
            .ok_or(RepositoryError::NotFound)?;

        let found = self.requests[index].version;
        if found != request.version {
            return Err(RepositoryError::StaleWrite {
                expected: request.version,
                found,
            });
        }
        Ok(index)
    }

    fn item_slot(&self, item: &ClearanceItem) -> Result<usize, RepositoryError> {
        self.items
            .iter()
            .position(|stored| stored.id == item.id)
            .ok_or(RepositoryError::NotFound)
    }
}

/// Process-local store guarding all collections with a single mutex.
#[derive(Debug, Default, Clone)]
pub struct InMemoryClearanceStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryClearanceStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl ClearanceStore for InMemoryClearanceStore {
    fn insert_department(&self, department: Department) -> Result<Department, RepositoryError> {
        let mut guard = self.lock()?;
        if guard
            .departments
            .iter()
            .any(|stored| stored.name == department.name || stored.id == department.id)
        {
            return Err(RepositoryError::Conflict(format!(
                "department {}",
                department.name
            )));
        }
        guard.departments.push(department.clone());
        Ok(department)
    }

    fn fetch_department(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.departments.iter().find(|dept| &dept.id == id).cloned())
    }

    fn departments(&self) -> Result<Vec<Department>, RepositoryError> {
        let guard = self.lock()?;
        let mut departments = guard.departments.clone();
        departments.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(departments)
    }

    fn insert_user(&self, user: UserProfile) -> Result<UserProfile, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.users.iter().any(|stored| stored.email == user.email) {
            return Err(RepositoryError::Conflict(format!("email {}", user.email)));
        }
        if let Some(details) = &user.student {
            let taken = guard.users.iter().any(|stored| {
                stored
                    .student
                    .as_ref()
                    .is_some_and(|other| other.matric_number == details.matric_number)
            });
            if taken {
                return Err(RepositoryError::Conflict(format!(
                    "matric number {}",
                    details.matric_number
                )));
            }
        }
        if guard.users.iter().any(|stored| stored.id == user.id) {
            return Err(RepositoryError::Conflict(format!("user {}", user.id)));
        }
        guard.users.push(user.clone());
        Ok(user)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.users.iter().find(|user| &user.id == id).cloned())
    }

    fn users(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        Ok(self.lock()?.users.clone())
    }

    fn fetch_item(&self, id: &ItemId) -> Result<Option<ClearanceItem>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.items.iter().find(|item| &item.id == id).cloned())
    }

    fn items_for_student(&self, student: &UserId) -> Result<Vec<ClearanceItem>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .items
            .iter()
            .filter(|item| &item.student_id == student)
            .cloned()
            .collect())
    }

    fn items_for_department(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<ClearanceItem>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .items
            .iter()
            .filter(|item| &item.department_id == department)
            .cloned()
            .collect())
    }

    fn fetch_request(
        &self,
        student: &UserId,
    ) -> Result<Option<ClearanceRequest>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .requests
            .iter()
            .find(|request| &request.student_id == student)
            .cloned())
    }

    fn requests(&self) -> Result<Vec<ClearanceRequest>, RepositoryError> {
        Ok(self.lock()?.requests.clone())
    }

    fn create_clearance(
        &self,
        request: ClearanceRequest,
        items: Vec<ClearanceItem>,
    ) -> Result<ClearanceRequest, RepositoryError> {
        let mut guard = self.lock()?;
        if guard
            .requests
            .iter()
            .any(|stored| stored.student_id == request.student_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "clearance request for student {}",
                request.student_id
            )));
        }

        for (index, item) in items.iter().enumerate() {
            let duplicate_pair = guard.items.iter().chain(&items[..index]).any(|stored| {
                stored.student_id == item.student_id && stored.department_id == item.department_id
            });
            if duplicate_pair {
                return Err(RepositoryError::Conflict(format!(
                    "clearance item for student {} in department {}",
                    item.student_id, item.department_id
                )));
            }
        }

        guard.requests.push(request.clone());
        guard.items.extend(items);
        Ok(request)
    }

    fn commit_decision(
        &self,
        item: ClearanceItem,
        request: Option<ClearanceRequest>,
    ) -> Result<Option<ClearanceRequest>, RepositoryError> {
        let mut guard = self.lock()?;
        let item_index = guard.item_slot(&item)?;

        // Validate both writes before touching either record.
        let stored_request = match request {
            Some(mut request) => {
                let request_index = guard.request_slot(&request)?;
                request.version += 1;
                Some((request_index, request))
            }
            None => None,
        };

        guard.items[item_index] = item;
        Ok(stored_request.map(|(index, request)| {
            guard.requests[index] = request.clone();
            request
        }))
    }

    fn commit_request(
        &self,
        mut request: ClearanceRequest,
    ) -> Result<ClearanceRequest, RepositoryError> {
        let mut guard = self.lock()?;
        let index = guard.request_slot(&request)?;
        request.version += 1;
        guard.requests[index] = request.clone();
        Ok(request)
    }
}
