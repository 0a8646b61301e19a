use super::domain::{
    ClearanceItem, ClearanceRequest, Department, DepartmentId, ItemId, UserId, UserProfile,
};

/// Storage port for the four clearance collections.
///
/// Implementations must apply `create_clearance`, `commit_decision`, and `commit_request`
/// atomically. Request writes carry the `version` they were read at; a mismatch with the
/// stored version is a `StaleWrite`, and every accepted request write bumps the version.
pub trait ClearanceStore: Send + Sync {
    /// Fails with `Conflict` when the department name is already registered.
    fn insert_department(&self, department: Department) -> Result<Department, RepositoryError>;
    fn fetch_department(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError>;
    /// Registered departments in evaluation order.
    fn departments(&self) -> Result<Vec<Department>, RepositoryError>;

    /// Fails with `Conflict` on a duplicate email or student matric number.
    fn insert_user(&self, user: UserProfile) -> Result<UserProfile, RepositoryError>;
    fn fetch_user(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;
    fn users(&self) -> Result<Vec<UserProfile>, RepositoryError>;

    fn fetch_item(&self, id: &ItemId) -> Result<Option<ClearanceItem>, RepositoryError>;
    fn items_for_student(&self, student: &UserId) -> Result<Vec<ClearanceItem>, RepositoryError>;
    fn items_for_department(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<ClearanceItem>, RepositoryError>;

    fn fetch_request(&self, student: &UserId)
        -> Result<Option<ClearanceRequest>, RepositoryError>;
    fn requests(&self) -> Result<Vec<ClearanceRequest>, RepositoryError>;

    /// Stores a new request together with its items, or nothing at all.
    fn create_clearance(
        &self,
        request: ClearanceRequest,
        items: Vec<ClearanceItem>,
    ) -> Result<ClearanceRequest, RepositoryError>;

    /// Replaces an item and, when given, its request in one unit.
    fn commit_decision(
        &self,
        item: ClearanceItem,
        request: Option<ClearanceRequest>,
    ) -> Result<Option<ClearanceRequest>, RepositoryError>;

    fn commit_request(&self, request: ClearanceRequest)
        -> Result<ClearanceRequest, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently (expected version {expected}, found {found})")]
    StaleWrite { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
