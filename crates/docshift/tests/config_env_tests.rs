//! Configuration loading from the process environment and `.env` files
//!
//! These tests mutate process-wide environment variables and run serially.

use docshift::config::AppConfig;
use serial_test::serial;
use std::io::Write;

const VARS: &[(&str, &str)] = &[
    ("MONGODB_DATABASE", "app"),
    ("MONGODB_COLLECTION", "orders"),
    ("REDSHIFT_HOST", "cluster.example.com"),
    ("REDSHIFT_DB", "analytics"),
    ("REDSHIFT_USER", "loader"),
    ("REDSHIFT_PASSWORD", "pw"),
    ("REDSHIFT_TABLE", "orders"),
    ("S3_BUCKET_NAME", "staging"),
    ("AWS_ACCESS_KEY_ID", "AKIA"),
    ("AWS_SECRET_ACCESS_KEY", "secret"),
    ("SPARKPOST_API_KEY", "key"),
    ("NOTIFY_FROM", "no-reply@example.com"),
    ("NOTIFY_RECIPIENTS", "ops@example.com"),
];

fn clear() {
    for (name, _) in VARS {
        std::env::remove_var(name);
    }
    std::env::remove_var("REDSHIFT_IAM_ROLE");
}

#[test]
#[serial]
fn test_load_from_env_file() {
    clear();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    for (name, value) in VARS {
        writeln!(file, "{}={}", name, value).unwrap();
    }
    writeln!(file, "REDSHIFT_IAM_ROLE=arn:aws:iam::1:role/loader").unwrap();
    file.flush().unwrap();

    let config = AppConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.source.collection, "orders");
    assert_eq!(config.warehouse.qualified_table(), "public.orders");
    assert_eq!(
        config.warehouse.iam_role.as_deref(),
        Some("arn:aws:iam::1:role/loader")
    );

    clear();
}

#[test]
#[serial]
fn test_process_env_wins_over_env_file() {
    clear();
    for (name, value) in VARS {
        std::env::set_var(name, value);
    }
    std::env::set_var("MONGODB_COLLECTION", "from-process");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "MONGODB_COLLECTION=from-file").unwrap();
    file.flush().unwrap();

    let config = AppConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.source.collection, "from-process");

    clear();
}

#[test]
#[serial]
fn test_missing_env_file_is_error() {
    clear();
    let result = AppConfig::load(Some(std::path::Path::new("/nonexistent/docshift.env")));
    assert!(result.is_err());
}
