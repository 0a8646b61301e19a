use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::certificate::Certificate;
use super::commands::{DecideClearanceItem, InitiateClearance, RegisterDepartment, RegisterUser};
use super::domain::{Department, DepartmentId, ItemId, UserId, UserProfile};
use super::report::{
    DecisionOutcome, InitiatedClearance, ItemWithStudent, RequestListing, SummaryCounts,
    TrackedClearance, UserListing,
};
use super::repository::ClearanceStore;
use super::service::{ClearanceError, ClearanceWorkflow};

type Shared<S> = State<Arc<ClearanceWorkflow<S>>>;
type Reply<T> = Result<(StatusCode, Json<T>), ClearanceError>;

/// Router builder exposing the clearance workflow over HTTP.
pub fn clearance_router<S>(service: Arc<ClearanceWorkflow<S>>) -> Router
where
    S: ClearanceStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/clearance/requests",
            post(initiate_handler::<S>).get(list_requests_handler::<S>),
        )
        .route(
            "/api/v1/clearance/students/:student_id",
            get(track_handler::<S>),
        )
        .route(
            "/api/v1/clearance/students/:student_id/certificate",
            post(certificate_handler::<S>),
        )
        .route(
            "/api/v1/clearance/items/:item_id",
            get(item_detail_handler::<S>),
        )
        .route(
            "/api/v1/clearance/items/:item_id/decision",
            post(decision_handler::<S>),
        )
        .route(
            "/api/v1/departments",
            get(list_departments_handler::<S>).post(register_department_handler::<S>),
        )
        .route(
            "/api/v1/departments/:department_id/pending",
            get(pending_handler::<S>),
        )
        .route(
            "/api/v1/users",
            get(list_users_handler::<S>).post(register_user_handler::<S>),
        )
        .route("/api/v1/summary", get(summary_handler::<S>))
        .with_state(service)
}

impl ClearanceError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Precondition(_) => StatusCode::PRECONDITION_FAILED,
            Self::Incomplete(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ClearanceError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status_code(), Json(payload)).into_response()
    }
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ClearanceError> {
    payload
        .map(|Json(command)| command)
        .map_err(|rejection| ClearanceError::Validation(rejection.body_text()))
}

pub(crate) async fn initiate_handler<S>(
    State(service): Shared<S>,
    payload: Result<Json<InitiateClearance>, JsonRejection>,
) -> Reply<InitiatedClearance>
where
    S: ClearanceStore + 'static,
{
    let command = parse_body(payload)?;
    let initiated = service.initiate(command)?;
    Ok((StatusCode::CREATED, Json(initiated)))
}

pub(crate) async fn list_requests_handler<S>(
    State(service): Shared<S>,
) -> Reply<Vec<RequestListing>>
where
    S: ClearanceStore + 'static,
{
    Ok((StatusCode::OK, Json(service.requests()?)))
}

pub(crate) async fn track_handler<S>(
    State(service): Shared<S>,
    Path(student_id): Path<String>,
) -> Reply<TrackedClearance>
where
    S: ClearanceStore + 'static,
{
    let tracked = service.track(&UserId(student_id))?;
    Ok((StatusCode::OK, Json(tracked)))
}

pub(crate) async fn certificate_handler<S>(
    State(service): Shared<S>,
    Path(student_id): Path<String>,
) -> Reply<Certificate>
where
    S: ClearanceStore + 'static,
{
    let certificate = service.issue_certificate(&UserId(student_id))?;
    Ok((StatusCode::OK, Json(certificate)))
}

pub(crate) async fn item_detail_handler<S>(
    State(service): Shared<S>,
    Path(item_id): Path<String>,
) -> Reply<ItemWithStudent>
where
    S: ClearanceStore + 'static,
{
    let detail = service.item_detail(&ItemId(item_id))?;
    Ok((StatusCode::OK, Json(detail)))
}

pub(crate) async fn decision_handler<S>(
    State(service): Shared<S>,
    Path(item_id): Path<String>,
    payload: Result<Json<DecideClearanceItem>, JsonRejection>,
) -> Reply<DecisionOutcome>
where
    S: ClearanceStore + 'static,
{
    let command = parse_body(payload)?;
    let outcome = service.decide(&ItemId(item_id), command)?;
    Ok((StatusCode::OK, Json(outcome)))
}

pub(crate) async fn list_departments_handler<S>(
    State(service): Shared<S>,
) -> Reply<Vec<Department>>
where
    S: ClearanceStore + 'static,
{
    Ok((StatusCode::OK, Json(service.departments()?)))
}

pub(crate) async fn register_department_handler<S>(
    State(service): Shared<S>,
    payload: Result<Json<RegisterDepartment>, JsonRejection>,
) -> Reply<Department>
where
    S: ClearanceStore + 'static,
{
    let command = parse_body(payload)?;
    let department = service.register_department(command)?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub(crate) async fn pending_handler<S>(
    State(service): Shared<S>,
    Path(department_id): Path<String>,
) -> Reply<Vec<ItemWithStudent>>
where
    S: ClearanceStore + 'static,
{
    let pending = service.pending_for_department(&DepartmentId(department_id))?;
    Ok((StatusCode::OK, Json(pending)))
}

pub(crate) async fn list_users_handler<S>(State(service): Shared<S>) -> Reply<Vec<UserListing>>
where
    S: ClearanceStore + 'static,
{
    Ok((StatusCode::OK, Json(service.users()?)))
}

pub(crate) async fn register_user_handler<S>(
    State(service): Shared<S>,
    payload: Result<Json<RegisterUser>, JsonRejection>,
) -> Reply<UserProfile>
where
    S: ClearanceStore + 'static,
{
    let command = parse_body(payload)?;
    let user = service.register_user(command)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn summary_handler<S>(State(service): Shared<S>) -> Reply<SummaryCounts>
where
    S: ClearanceStore + 'static,
{
    Ok((StatusCode::OK, Json(service.summary()?)))
}
