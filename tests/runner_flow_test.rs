mod common;

use std::time::Duration;

use common::*;
use httpmock::prelude::*;
use serde_json::json;
use sf_bulk::core::records::{parse_records, InputFormat};
use sf_bulk::{
    BulkError, BulkRunner, CreateJobDto, HttpConfig, JobService, LocalStorage, LoginParams,
    Operation, PollSettings, SalesforceClient,
};
use tempfile::TempDir;

const ACCOUNTS_CSV: &str = "Name,Industry\nAcme,Technology\nGlobex,\n,Retail\n";

async fn session_client(server: &MockServer) -> SalesforceClient {
    let params = LoginParams::with_session(server.base_url(), "SESSION");
    let config = HttpConfig {
        timeout: Duration::from_secs(5),
        retry_attempts: 0,
        retry_delay: Duration::from_millis(0),
    };
    SalesforceClient::connect(params, config).await.unwrap()
}

fn instant_polls() -> PollSettings {
    PollSettings {
        min_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
        max_wait: Some(Duration::from_secs(5)),
    }
}

fn output_storage(dir: &TempDir) -> LocalStorage {
    LocalStorage::new(dir.path().to_string_lossy().to_string())
}

#[tokio::test]
async fn test_csv_upload_writes_error_reports() -> anyhow::Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;

    server.mock(|when, then| {
        when.method(POST).path(async_path("job"));
        then.status(201).json_body(job_json("Account", "insert", "Open"));
    });
    let first_batch = server.mock(|when, then| {
        when.method(POST)
            .path(async_path(&format!("job/{}/batch", JOB_ID)))
            .body_contains("Acme")
            .body_contains("Globex");
        then.status(201).json_body(batch_json("7511", "Queued"));
    });
    let second_batch = server.mock(|when, then| {
        when.method(POST)
            .path(async_path(&format!("job/{}/batch", JOB_ID)))
            .body_contains(r#""Name":null"#);
        then.status(201).json_body(batch_json("7512", "Queued"));
    });
    let close = server.mock(|when, then| {
        when.method(POST)
            .path(async_path(&format!("job/{}", JOB_ID)))
            .json_body(json!({"state": "Closed"}));
        then.status(200).json_body(job_json("Account", "insert", "Closed"));
    });
    server.mock(|when, then| {
        when.method(GET).path(async_path(&format!("job/{}/batch", JOB_ID)));
        then.status(200).json_body(json!({
            "batchInfo": [batch_json("7511", "Completed"), batch_json("7512", "Completed")]
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path(async_path(&format!("job/{}/batch/7511/result", JOB_ID)));
        then.status(200).json_body(json!([
            {"success": true, "created": true, "id": "001A", "errors": []},
            {"success": true, "created": true, "id": "001B", "errors": []}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path(async_path(&format!("job/{}/batch/7512/result", JOB_ID)));
        then.status(200).json_body(json!([
            {"success": false, "created": false, "id": null, "errors": [
                {"fields": ["Name"], "message": "Required fields are missing: [Name]",
                 "statusCode": "REQUIRED_FIELD_MISSING"}
            ]}
        ]));
    });

    let records = parse_records(ACCOUNTS_CSV.as_bytes(), InputFormat::Csv)?;
    let service = JobService::new(session_client(&server).await).with_poll_settings(instant_polls());
    let mut runner = BulkRunner::new(
        service,
        output_storage(&output),
        CreateJobDto::new("Account", Operation::Insert),
        2,
    );

    let summary = runner.run(records).await?;

    first_batch.assert();
    second_batch.assert();
    close.assert();

    assert_eq!(summary.job_id, JOB_ID);
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.records, 3);
    assert_eq!(summary.failed_batches, 0);
    assert_eq!(summary.failed_records, 1);

    let json_report = std::fs::read_to_string(output.path().join(summary.json_report_name()))?;
    let report: serde_json::Value = serde_json::from_str(&json_report)?;
    assert_eq!(report["job_id"], JOB_ID);
    assert_eq!(report["errors"].as_array().map(|e| e.len()), Some(1));

    let csv_report = std::fs::read_to_string(output.path().join(summary.csv_report_name()))?;
    let mut lines = csv_report.lines();
    assert_eq!(lines.next(), Some("batch_id,batch_state,record_index,errors"));
    let row = lines.next().unwrap_or_default();
    assert!(row.starts_with("7512,Completed,0,"));
    assert!(row.contains("REQUIRED_FIELD_MISSING"));
    assert!(lines.next().is_none());

    Ok(())
}

#[tokio::test]
async fn test_clean_run_writes_only_json_report() -> anyhow::Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;

    server.mock(|when, then| {
        when.method(POST).path(async_path("job"));
        then.status(201).json_body(job_json("Account", "insert", "Open"));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path(async_path(&format!("job/{}/batch", JOB_ID)));
        then.status(201).json_body(batch_json("7511", "Queued"));
    });
    server.mock(|when, then| {
        when.method(POST).path(async_path(&format!("job/{}", JOB_ID)));
        then.status(200).json_body(job_json("Account", "insert", "Closed"));
    });
    server.mock(|when, then| {
        when.method(GET).path(async_path(&format!("job/{}/batch", JOB_ID)));
        then.status(200).json_body(json!({"batchInfo": [batch_json("7511", "Completed")]}));
    });
    server.mock(|when, then| {
        when.method(GET).path_contains("/result");
        then.status(200).json_body(json!([
            {"success": true, "created": true, "id": "001A", "errors": []}
        ]));
    });

    let records = parse_records(br#"[{"Name": "Acme"}]"#, InputFormat::Json)?;
    let service = JobService::new(session_client(&server).await).with_poll_settings(instant_polls());
    let mut runner = BulkRunner::new(
        service,
        output_storage(&output),
        CreateJobDto::new("Account", Operation::Insert),
        10_000,
    );

    let summary = runner.run(records).await?;

    assert!(!summary.has_errors());
    assert!(output.path().join(summary.json_report_name()).exists());
    assert!(!output.path().join(summary.csv_report_name()).exists());

    Ok(())
}

#[tokio::test]
async fn test_rejected_batch_aborts_job() {
    let server = MockServer::start();
    let output = TempDir::new().unwrap();

    server.mock(|when, then| {
        when.method(POST).path(async_path("job"));
        then.status(201).json_body(job_json("Account", "insert", "Open"));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path(async_path(&format!("job/{}/batch", JOB_ID)));
        then.status(400).json_body(json!({
            "exceptionCode": "InvalidBatch",
            "exceptionMessage": "Records are not in the expected format"
        }));
    });
    let abort = server.mock(|when, then| {
        when.method(POST)
            .path(async_path(&format!("job/{}", JOB_ID)))
            .json_body(json!({"state": "Aborted"}));
        then.status(200).json_body(job_json("Account", "insert", "Aborted"));
    });

    let records = parse_records(br#"[{"Name": "Acme"}]"#, InputFormat::Json).unwrap();
    let service = JobService::new(session_client(&server).await).with_poll_settings(instant_polls());
    let mut runner = BulkRunner::new(
        service,
        output_storage(&output),
        CreateJobDto::new("Account", Operation::Insert),
        100,
    );

    let err = runner.run(records).await.unwrap_err();

    abort.assert();
    assert!(matches!(err, BulkError::SalesforceError { ref code, .. } if code == "InvalidBatch"));
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upsert_without_external_id_never_calls_salesforce() {
    let server = MockServer::start();
    let output = TempDir::new().unwrap();
    let any_call = server.mock(|when, then| {
        when.path_contains("/services/async/");
        then.status(500);
    });

    let records = parse_records(br#"[{"Name": "Acme"}]"#, InputFormat::Json).unwrap();
    let service = JobService::new(session_client(&server).await);
    let mut runner = BulkRunner::new(
        service,
        output_storage(&output),
        CreateJobDto::new("Account", Operation::Upsert),
        100,
    );

    let err = runner.run(records).await.unwrap_err();

    any_call.assert_hits(0);
    assert!(matches!(err, BulkError::MissingConfigError { ref field } if field == "job.external_id_field"));
}
