use crate::infra::{seed_standard_departments, SeededDepartment};
use clap::Args;
use clearance_tracker::error::AppError;
use clearance_tracker::workflows::clearance::{
    CertificateConfig, ClearanceError, ClearanceRequest, ClearanceWorkflow, DecideClearanceItem,
    Decision, DepartmentId, InMemoryClearanceStore, InitiateClearance, RegisterUser, Role,
    StudentLevel,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Have the first department reject before approving, showing the blocked certificate.
    #[arg(long)]
    pub(crate) reject_first: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Clearance workflow demo");
    for line in demo_transcript(args.reject_first)? {
        println!("{line}");
    }
    Ok(())
}

/// Runs one student through the full workflow against an in-memory store.
fn demo_transcript(reject_first: bool) -> Result<Vec<String>, ClearanceError> {
    let service = ClearanceWorkflow::new(
        Arc::new(InMemoryClearanceStore::default()),
        CertificateConfig::default(),
    );
    let seeded = seed_standard_departments(&service)?;
    let mut transcript = vec![format!("- {} departments registered", seeded.len())];

    let student = service.register_user(RegisterUser {
        email: "john@unicross.edu.ng".to_string(),
        name: "John Doe".to_string(),
        role: Role::Student,
        department_id: None,
        matric_number: Some("UNI/2020/001".to_string()),
        faculty: Some("Science".to_string()),
        department: Some("Computer Science".to_string()),
        level: Some(StudentLevel::L400),
    })?;

    let initiated = service.initiate(InitiateClearance {
        student_id: student.id.clone(),
    })?;
    transcript.push(format!(
        "- {} initiated clearance: {}",
        student.name,
        progress(&initiated.request, &seeded)
    ));

    for (index, (item, entry)) in initiated.items.iter().zip(&seeded).enumerate() {
        let decide = |status: Decision, remarks: Option<&str>| DecideClearanceItem {
            staff_id: entry.staff.id.clone(),
            department_id: entry.department.id.clone(),
            status,
            remarks: remarks.map(str::to_string),
        };

        if reject_first && index == 0 {
            let outcome = service.decide(
                &item.id,
                decide(Decision::Rejected, Some("Outstanding library fine")),
            )?;
            transcript.push(format!(
                "- {} rejected: {}",
                entry.department.name,
                progress(&outcome.request, &seeded)
            ));
        }

        let outcome = service.decide(&item.id, decide(Decision::Approved, None))?;
        transcript.push(format!(
            "- {} approved: {}",
            entry.department.name,
            progress(&outcome.request, &seeded)
        ));

        if index == 0 {
            if let Err(err) = service.issue_certificate(&student.id) {
                transcript.push(format!("  certificate withheld ({}): {err}", err.kind()));
            }
        }
    }

    let certificate = service.issue_certificate(&student.id)?;
    transcript.push(format!(
        "- Certificate issued at {} on {}",
        certificate.certificate_url,
        certificate.issued_at.format("%Y-%m-%d %H:%M UTC")
    ));
    Ok(transcript)
}

fn progress(request: &ClearanceRequest, seeded: &[SeededDepartment]) -> String {
    let names = |ids: &[DepartmentId]| -> String {
        let names: Vec<&str> = ids
            .iter()
            .map(|id| {
                seeded
                    .iter()
                    .find(|entry| &entry.department.id == id)
                    .map_or(id.0.as_str(), |entry| entry.department.name.as_str())
            })
            .collect();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    };

    format!(
        "status {} | pending [{}] | completed [{}] | rejected [{}]",
        request.status.label(),
        names(&request.pending_departments),
        names(&request.completed_departments),
        names(&request.rejected_departments)
    )
}
