mod common;

use assert_matches::assert_matches;
use common::{job_input, TestApp};
use garment_factory_api::{
    entities::production_job::{JobPriority, JobStatus},
    errors::ServiceError,
    services::{job_status::JobEvent, production_jobs::QcCheckpointInput},
};
use rstest::rstest;

async fn advance(app: &TestApp, job_id: uuid::Uuid, statuses: &[JobStatus]) {
    for status in statuses {
        app.services()
            .jobs
            .update_job_status(&app.ctx(), job_id, *status, None)
            .await
            .unwrap_or_else(|e| panic!("move to {}: {}", status, e));
    }
}

#[tokio::test]
async fn new_jobs_start_pending_with_generated_number() {
    let app = TestApp::new().await;
    let job = app.seed_job(120).await;

    assert_eq!(job.status, JobStatus::Pending.to_string());
    assert_eq!(job.priority, JobPriority::Normal.to_string());
    assert_eq!(job.progress_percent, 0);
    assert!(job.job_number.starts_with("JOB-"));
    assert!(job.started_at.is_none());

    let found = app
        .services()
        .jobs
        .get_job_by_number(&job.job_number)
        .await
        .expect("lookup by number");
    assert_eq!(found.id, job.id);
}

#[tokio::test]
async fn duplicate_job_numbers_conflict() {
    let app = TestApp::new().await;
    let mut input = job_input(10);
    input.job_number = Some("JOB-FIXED-1".to_string());
    app.services()
        .jobs
        .create_job(&app.ctx(), input.clone())
        .await
        .expect("first");

    assert_matches!(
        app.services().jobs.create_job(&app.ctx(), input).await,
        Err(ServiceError::Conflict(_))
    );
}

#[tokio::test]
async fn blank_job_numbers_are_rejected() {
    let app = TestApp::new().await;
    let mut input = job_input(10);
    input.job_number = Some("   ".to_string());

    assert_matches!(
        app.services().jobs.create_job(&app.ctx(), input).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn rework_number_taken_by_another_job_conflicts() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let mut input = job_input(40);
    input.job_number = Some("JOB-20241105-TAKEN1".to_string());
    let original = app
        .services()
        .jobs
        .create_job(&ctx, input.clone())
        .await
        .expect("original");

    input.job_number = Some("JOB-20241105-TAKEN1-RW1".to_string());
    app.services()
        .jobs
        .create_job(&ctx, input)
        .await
        .expect("job holding the rework number");

    assert_matches!(
        app.services()
            .jobs
            .create_rework_job(&ctx, original.id, 4, "Faded print".into())
            .await,
        Err(ServiceError::Conflict(_))
    );
    let original = app.services().jobs.get_job(original.id).await.expect("job");
    assert_eq!(original.rework_count, 0);
}

#[tokio::test]
async fn first_printing_transition_stamps_start_and_logs_once() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let job = app.seed_job(50).await;

    let printing = app
        .services()
        .jobs
        .update_job_status(&ctx, job.id, JobStatus::Printing, Some("Screens ready".into()))
        .await
        .expect("pending -> printing");
    assert_eq!(printing.status, "printing");
    assert_eq!(printing.progress_percent, 40);
    let started = printing.started_at.expect("started_at stamped");

    let logs = app.services().jobs.job_logs(job.id).await.expect("logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].from_status.as_deref(), Some("pending"));
    assert_eq!(logs[0].to_status, "printing");
    assert_eq!(logs[0].note.as_deref(), Some("Screens ready"));
    assert_eq!(logs[0].actor_id, ctx.actor_id);

    let audits = app
        .services()
        .audit
        .list_for_entity("production_job", job.id)
        .await
        .expect("audit");
    let status_changes: Vec<_> = audits.iter().filter(|a| a.action == "status_change").collect();
    assert_eq!(status_changes.len(), 1);

    // Later floor statuses keep the original start time.
    let curing = app
        .services()
        .jobs
        .update_job_status(&ctx, job.id, JobStatus::Curing, None)
        .await
        .expect("printing -> curing");
    assert_eq!(curing.started_at, Some(started));
}

#[tokio::test]
async fn illegal_transitions_are_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let job = app.seed_job(10).await;

    let err = app
        .services()
        .jobs
        .update_job_status(&app.ctx(), job.id, JobStatus::Completed, None)
        .await
        .expect_err("pending cannot complete");
    assert_matches!(err, ServiceError::InvalidStatus(_));

    let unchanged = app.services().jobs.get_job(job.id).await.expect("job");
    assert_eq!(unchanged.status, "pending");
    assert!(app.services().jobs.job_logs(job.id).await.expect("logs").is_empty());
}

#[tokio::test]
async fn requesting_current_status_is_a_no_op() {
    let app = TestApp::new().await;
    let job = app.seed_job(10).await;

    let same = app
        .services()
        .jobs
        .update_job_status(&app.ctx(), job.id, JobStatus::Pending, None)
        .await
        .expect("no-op");
    assert_eq!(same.id, job.id);
    assert_eq!(same.status, "pending");
    assert!(app.services().jobs.job_logs(job.id).await.expect("logs").is_empty());
}

#[rstest]
#[case(JobStatus::Completed)]
#[case(JobStatus::Cancelled)]
#[tokio::test]
async fn terminal_statuses_refuse_to_start_printing(#[case] terminal: JobStatus) {
    let app = TestApp::new().await;
    let job = app.seed_job(10).await;

    match terminal {
        JobStatus::Completed => advance(
            &app,
            job.id,
            &[JobStatus::Printing, JobStatus::Packing, JobStatus::Completed],
        )
        .await,
        _ => advance(&app, job.id, &[terminal]).await,
    }

    assert_matches!(
        app.services()
            .jobs
            .apply_event(&app.ctx(), job.id, JobEvent::StartPrinting, None)
            .await,
        Err(ServiceError::InvalidStatus(_))
    );
}

#[tokio::test]
async fn completion_stamps_completed_at() {
    let app = TestApp::new().await;
    let job = app.seed_job(10).await;
    advance(
        &app,
        job.id,
        &[JobStatus::Printing, JobStatus::Curing, JobStatus::Packing],
    )
    .await;

    let done = app
        .services()
        .jobs
        .apply_event(&app.ctx(), job.id, JobEvent::Complete, None)
        .await
        .expect("complete");
    assert_eq!(done.status, "completed");
    assert_eq!(done.progress_percent, 100);
    assert!(done.completed_at.is_some());
}

#[tokio::test]
async fn qc_records_checkpoints_and_apportions_output() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let job = app.seed_job(100).await;
    advance(&app, job.id, &[JobStatus::Printing, JobStatus::Packing]).await;
    app.services()
        .jobs
        .record_output(&ctx, job.id, 96)
        .await
        .expect("output");

    let result = app
        .services()
        .jobs
        .perform_qc_check(
            &ctx,
            job.id,
            vec![
                QcCheckpointInput {
                    checkpoint: "print_alignment".into(),
                    passed: true,
                    note: None,
                },
                QcCheckpointInput {
                    checkpoint: "wash_test".into(),
                    passed: false,
                    note: Some("Cracking after two washes".into()),
                },
            ],
            false,
        )
        .await
        .expect("qc");

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.job.status, "qc_failed");
    assert_eq!(result.job.passed_qty, 0);
    assert_eq!(result.job.failed_qty, 96);

    let logs = app.services().jobs.job_logs(job.id).await.expect("logs");
    let last = logs.last().expect("qc log");
    assert_eq!(last.note.as_deref(), Some("QC failed: 1/2 checkpoints passed"));

    let qc_audits = app
        .services()
        .audit
        .list_for_entity("production_job", job.id)
        .await
        .expect("audit")
        .into_iter()
        .filter(|a| a.action == "qc_check")
        .count();
    assert_eq!(qc_audits, 1);

    // A failed job can go back to printing.
    let retry = app
        .services()
        .jobs
        .update_job_status(&ctx, job.id, JobStatus::Printing, None)
        .await
        .expect("qc_failed -> printing");
    assert_eq!(retry.status, "printing");
}

#[tokio::test]
async fn qc_needs_checkpoints_and_a_finished_job() {
    let app = TestApp::new().await;
    let job = app.seed_job(10).await;
    let checkpoint = QcCheckpointInput {
        checkpoint: "colour_match".into(),
        passed: true,
        note: None,
    };

    assert_matches!(
        app.services()
            .jobs
            .perform_qc_check(&app.ctx(), job.id, vec![], true)
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        app.services()
            .jobs
            .perform_qc_check(&app.ctx(), job.id, vec![checkpoint], true)
            .await,
        Err(ServiceError::InvalidStatus(_))
    );
    assert!(app.services().jobs.qc_records(job.id).await.expect("qc").is_empty());
}

#[tokio::test]
async fn rework_jobs_link_back_and_raise_priority() {
    let app = TestApp::new().await;
    let ctx = app.ctx();
    let mut input = job_input(200);
    input.job_number = Some("JOB-20241001-ABC123".into());
    input.priority = Some(JobPriority::High);
    let original = app
        .services()
        .jobs
        .create_job(&ctx, input)
        .await
        .expect("original");

    let first = app
        .services()
        .jobs
        .create_rework_job(&ctx, original.id, 12, "Misaligned back print".into())
        .await
        .expect("rework 1");
    assert_eq!(first.job_number, "JOB-20241001-ABC123-RW1");
    assert!(first.is_rework);
    assert_eq!(first.rework_of, Some(original.id));
    assert_eq!(first.quantity, 12);
    assert_eq!(first.priority, "urgent");
    assert_eq!(first.status, "pending");

    let second = app
        .services()
        .jobs
        .create_rework_job(&ctx, original.id, 3, "Ink smudge".into())
        .await
        .expect("rework 2");
    assert_eq!(second.job_number, "JOB-20241001-ABC123-RW2");

    let original = app.services().jobs.get_job(original.id).await.expect("job");
    assert_eq!(original.rework_count, 2);

    assert_matches!(
        app.services()
            .jobs
            .create_rework_job(&ctx, original.id, 5, "  ".into())
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn output_cannot_be_recorded_on_cancelled_jobs() {
    let app = TestApp::new().await;
    let job = app.seed_job(10).await;
    advance(&app, job.id, &[JobStatus::Cancelled]).await;

    assert_matches!(
        app.services().jobs.record_output(&app.ctx(), job.id, 5).await,
        Err(ServiceError::InvalidStatus(_))
    );
}
