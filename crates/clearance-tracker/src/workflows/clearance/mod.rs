//! University clearance workflow.
//!
//! A student opens one request covering every registered department. Department staff
//! approve or reject their item, each decision re-derives the aggregate request status,
//! and a certificate is issued only once every department has approved.

pub mod certificate;
pub mod commands;
pub mod domain;
pub(crate) mod locks;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use certificate::{
    certificate_gate, Certificate, CertificateBlock, CertificateConfig, DEFAULT_CERTIFICATE_PATH,
};
pub use commands::{DecideClearanceItem, InitiateClearance, RegisterDepartment, RegisterUser};
pub use domain::{
    derive_status, ClearanceItem, ClearanceRequest, Decision, Department, DepartmentId, ItemId,
    ItemStatus, PartitionViolation, RequestId, RequestStatus, Role, StudentDetails, StudentLevel,
    StudentSummary, UserId, UserProfile,
};
pub use report::{
    DecisionOutcome, DepartmentStats, InitiatedClearance, ItemWithStudent, RecentActivity,
    RequestCounts, RequestListing, SummaryCounts, TrackedClearance, UserCounts, UserListing,
};
pub use repository::{ClearanceStore, RepositoryError};
pub use router::clearance_router;
pub use service::{ClearanceError, ClearanceWorkflow};
pub use store::InMemoryClearanceStore;
