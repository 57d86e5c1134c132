//! Integration tests for container orchestration.
//!
//! These tests drive a real Postgres container through the database service.
//! Tests are skipped if Docker/Podman is not available or SKIP_CONTAINER_TESTS=1.

use chrono::{TimeZone, Utc};
use rpcheckup::container::executor::{self, ExecConfig, OutputMode};
use rpcheckup::container::{ContainerError, RuntimeSession};
use rpcheckup::report::{AccessLevel, ReportError, ReportPipeline};
use rpcheckup::services::{Credential, DatabaseOptions, DatabaseService};
use serial_test::serial;
use sqlx::Connection;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use std::time::Duration;

const TEST_CONTAINER_NAME: &str = "rpCheckup-db-it";
const REPORT_CONTAINER_NAME: &str = "rpCheckup-db-report-it";

/// The introspector tables the report queries read, reduced to the columns
/// they use.
const IMPORT_SCHEMA: &str = r#"
CREATE TABLE provider_account (
  id integer PRIMARY KEY,
  name text NOT NULL
);
CREATE TABLE import_job (
  id serial PRIMARY KEY,
  provider_account_id integer NOT NULL REFERENCES provider_account (id),
  end_date timestamp,
  error_details jsonb
);
CREATE TABLE aws_organizations_organization (
  id text PRIMARY KEY,
  provider_account_id integer NOT NULL
);
CREATE TABLE aws_organizations_account (
  id text NOT NULL,
  arn text NOT NULL,
  provider_account_id integer NOT NULL
);
CREATE TABLE resource (
  id integer PRIMARY KEY,
  provider_account_id integer NOT NULL REFERENCES provider_account (id),
  uri text NOT NULL,
  service text NOT NULL,
  provider_type text NOT NULL
);
CREATE TABLE resource_attribute (
  id serial PRIMARY KEY,
  resource_id integer NOT NULL REFERENCES resource (id),
  type text NOT NULL,
  attr_name text NOT NULL,
  attr_value jsonb
);
"#;

/// One finished import of account 123456789012 in organization o-abc123:
/// a public bucket, a bucket only its own account may read, and a snapshot
/// shared with another account in the organization.
const IMPORT_DATA: &str = r#"
INSERT INTO provider_account (id, name) VALUES (1, '123456789012');
INSERT INTO aws_organizations_organization (id, provider_account_id) VALUES ('o-abc123', 1);
INSERT INTO aws_organizations_account (id, arn, provider_account_id) VALUES
  ('123456789012', 'arn:aws:organizations::123456789012:account/o-abc123/123456789012', 1),
  ('333333333333', 'arn:aws:organizations::123456789012:account/o-abc123/333333333333', 1);
INSERT INTO import_job (provider_account_id, end_date, error_details) VALUES
  (1, '2024-03-01 08:00:00', NULL);
INSERT INTO resource (id, provider_account_id, uri, service, provider_type) VALUES
  (1, 1, 'arn:aws:s3:::public-bucket', 's3', 'Bucket'),
  (2, 1, 'arn:aws:s3:::private-bucket', 's3', 'Bucket'),
  (3, 1, 'arn:aws:ec2:us-east-1:123456789012:snapshot/snap-1', 'ec2', 'Snapshot');
INSERT INTO resource_attribute (resource_id, type, attr_name, attr_value) VALUES
  (1, 'Metadata', 'Policy',
   '{"Statement": [{"Effect": "Allow", "Principal": "*", "Action": "s3:GetObject"}]}'),
  (2, 'Metadata', 'Policy',
   '{"Statement": [{"Effect": "Allow", "Principal": {"AWS": "arn:aws:iam::123456789012:root"}, "Action": "s3:*"}]}'),
  (3, 'Metadata', 'CreateVolumePermissions', '[{"UserId": "333333333333"}]');
"#;

/// Check if container tests should run.
fn should_run_container_tests() -> bool {
    // Skip if explicitly disabled
    if let Ok(value) = std::env::var("SKIP_CONTAINER_TESTS")
        && (value == "1" || value.eq_ignore_ascii_case("true"))
    {
        return false;
    }

    // Check if Docker or Podman is available
    std::process::Command::new("docker")
        .arg("info")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
        || std::process::Command::new("podman")
            .arg("info")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
}

fn test_options() -> DatabaseOptions {
    DatabaseOptions {
        container_name: TEST_CONTAINER_NAME.to_string(),
        ..DatabaseOptions::default()
    }
}

/// Cleanup helper - removes the named container if it exists.
async fn cleanup_container(session: &RuntimeSession, name: &str) {
    if let Ok(Some(container)) = session.find_container(name).await {
        let _ = session.stop_and_remove(&container.id).await;
    }
}

/// Connect straight to the database container, retrying while the image's
/// init script still has the server restarting.
async fn connect_as(
    database: &DatabaseService,
    credential: &Credential,
    dbname: &str,
) -> PgConnection {
    let options = PgConnectOptions::new()
        .host(&database.address().host_ip)
        .port(database.address().host_port)
        .username(&credential.username)
        .password(&credential.password)
        .database(dbname);

    for _ in 0..30 {
        match PgConnection::connect_with(&options).await {
            Ok(conn) => return conn,
            Err(_) => tokio::time::sleep(Duration::from_secs(1)).await,
        }
    }
    PgConnection::connect_with(&options)
        .await
        .expect("Failed to connect to postgres")
}

#[tokio::test]
#[serial]
async fn test_session_connects() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests (Docker/Podman not available or SKIP_CONTAINER_TESTS=1)");
        return;
    }

    let session = RuntimeSession::open().await;
    assert!(
        session.is_ok(),
        "Failed to connect to Docker/Podman: {:?}",
        session.err()
    );
}

#[tokio::test]
#[serial]
async fn test_database_reuse_and_teardown() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    let session = RuntimeSession::open().await.expect("Failed to connect");
    cleanup_container(&session, TEST_CONTAINER_NAME).await;
    let options = test_options();

    let first = DatabaseService::start(&session, &options, true)
        .await
        .expect("Failed to start postgres");
    assert!(!first.was_adopted());

    let second = DatabaseService::start(&session, &options, true)
        .await
        .expect("Failed to reuse postgres");
    assert!(second.was_adopted());
    assert_eq!(first.address(), second.address());
    assert_eq!(first.handle().id(), second.handle().id());

    let outcome = executor::execute(
        &session,
        second.handle().id(),
        &ExecConfig::builder()
            .cmd(["psql", "-U", "postgres", "-c", "SELECT 1"])
            .attach_stdin(false)
            .build(),
        OutputMode::Discard,
    )
    .await
    .expect("Failed to exec in postgres");
    assert!(outcome.success());

    second.shut_down().await.expect("Failed to shut down");
    assert!(
        session
            .find_container(TEST_CONTAINER_NAME)
            .await
            .expect("Failed to list containers")
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn test_cancelled_session_refuses_work() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    let session = RuntimeSession::open().await.expect("Failed to connect");
    cleanup_container(&session, TEST_CONTAINER_NAME).await;
    session.cancellation().cancel();

    let err = DatabaseService::start(&session, &test_options(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ContainerError::Cancelled));
}

#[tokio::test]
#[serial]
async fn test_report_against_imported_database() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    let session = RuntimeSession::open().await.expect("Failed to connect");
    cleanup_container(&session, REPORT_CONTAINER_NAME).await;
    let options = DatabaseOptions {
        container_name: REPORT_CONTAINER_NAME.to_string(),
        ..DatabaseOptions::default()
    };
    let database = DatabaseService::start(&session, &options, false)
        .await
        .expect("Failed to start postgres");

    // What `introspector.py init` sets up: the importer role and its database
    let mut admin = connect_as(&database, &options.superuser, "postgres").await;
    sqlx::raw_sql("CREATE ROLE introspector LOGIN PASSWORD 'introspector'")
        .execute(&mut admin)
        .await
        .expect("Failed to create importer role");
    sqlx::raw_sql("CREATE DATABASE introspector OWNER introspector")
        .execute(&mut admin)
        .await
        .expect("Failed to create import database");
    admin.close().await.expect("Failed to close admin connection");

    let mut importer = connect_as(&database, &options.importer, "introspector").await;
    sqlx::raw_sql(IMPORT_SCHEMA)
        .execute(&mut importer)
        .await
        .expect("Failed to create import schema");

    let dsn = database.connection_string(&options.importer);
    let pipeline = ReportPipeline::default();

    let err = pipeline.generate(&dsn).await.unwrap_err();
    assert!(matches!(err, ReportError::NoImportData), "{:?}", err);

    sqlx::raw_sql(IMPORT_DATA)
        .execute(&mut importer)
        .await
        .expect("Failed to seed import");
    importer.close().await.expect("Failed to close importer connection");

    let report = pipeline.generate(&dsn).await.expect("report should generate");

    assert_eq!(report.metadata.account_id, "123456789012");
    assert_eq!(report.metadata.organization_label(), "o-abc123");
    assert_eq!(
        report.metadata.imported_at.with_timezone(&Utc),
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    );

    let rows: Vec<_> = report
        .rows
        .iter()
        .map(|r| (r.arn.as_str(), r.service.as_str(), r.provider_type.as_str(), r.access()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("arn:aws:s3:::public-bucket", "s3", "Bucket", AccessLevel::Public),
            (
                "arn:aws:ec2:us-east-1:123456789012:snapshot/snap-1",
                "ec2",
                "Snapshot",
                AccessLevel::InOrgAccounts
            ),
            ("arn:aws:s3:::private-bucket", "s3", "Bucket", AccessLevel::Private),
        ]
    );
    assert_eq!(report.rows[1].in_org_accounts, vec!["333333333333".to_string()]);
    assert!(report.rows[1].external_accounts.is_empty());

    database.shut_down().await.expect("Failed to shut down");
}
