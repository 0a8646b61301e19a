use clearance_tracker::workflows::clearance::{
    ClearanceError, ClearanceStore, ClearanceWorkflow, Department, RegisterDepartment,
    RegisterUser, Role, UserProfile,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

struct StandardDepartment {
    name: &'static str,
    description: &'static str,
    requirements: [&'static str; 3],
    staff_email: &'static str,
}

const STANDARD_DEPARTMENTS: [StandardDepartment; 5] = [
    StandardDepartment {
        name: "Library",
        description: "University Library",
        requirements: [
            "Return all borrowed books",
            "Pay any outstanding fines",
            "Return library card",
        ],
        staff_email: "library@unicross.edu.ng",
    },
    StandardDepartment {
        name: "Bursary",
        description: "University Bursary Department",
        requirements: [
            "Pay all outstanding fees",
            "Submit fee receipts",
            "Clear any financial obligations",
        ],
        staff_email: "bursary@unicross.edu.ng",
    },
    StandardDepartment {
        name: "Department",
        description: "Academic Department",
        requirements: [
            "Submit final project/thesis",
            "Return department properties",
            "Complete exit interview",
        ],
        staff_email: "department@unicross.edu.ng",
    },
    StandardDepartment {
        name: "Sports",
        description: "Sports Department",
        requirements: [
            "Return sports equipment",
            "Clear sports fee",
            "Return sports ID card",
        ],
        staff_email: "sports@unicross.edu.ng",
    },
    StandardDepartment {
        name: "Student Affairs",
        description: "Student Affairs Department",
        requirements: [
            "Return student ID card",
            "Clear hostel accommodation",
            "Complete exit form",
        ],
        staff_email: "studentaffairs@unicross.edu.ng",
    },
];

/// A seeded department and the staff account that decides for it.
pub(crate) struct SeededDepartment {
    pub(crate) department: Department,
    pub(crate) staff: UserProfile,
}

/// Registers the five standard departments in evaluation order, one staff account each.
pub(crate) fn seed_standard_departments<S>(
    service: &ClearanceWorkflow<S>,
) -> Result<Vec<SeededDepartment>, ClearanceError>
where
    S: ClearanceStore + 'static,
{
    let mut seeded = Vec::with_capacity(STANDARD_DEPARTMENTS.len());
    for (order, standard) in (1..).zip(STANDARD_DEPARTMENTS.iter()) {
        let department = service.register_department(RegisterDepartment {
            name: standard.name.to_string(),
            description: Some(standard.description.to_string()),
            order,
            requirements: standard
                .requirements
                .iter()
                .map(|requirement| requirement.to_string())
                .collect(),
        })?;

        let staff = service.register_user(RegisterUser {
            email: standard.staff_email.to_string(),
            name: format!("{} Staff", standard.name),
            role: Role::Staff,
            department_id: Some(department.id.clone()),
            matric_number: None,
            faculty: None,
            department: None,
            level: None,
        })?;

        seeded.push(SeededDepartment { department, staff });
    }

    info!(departments = seeded.len(), "standard departments seeded");
    Ok(seeded)
}
