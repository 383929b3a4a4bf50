//! Loading sink settings from files

use std::io::Write;

use sluice_rdbc::connection::Credentials;
use sluice_sink::prelude::*;

#[test]
fn test_yaml_file_to_writer() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        r#"
driver: memory
url: jdbc:test
username: writer
password: ${{SLUICE_SETTINGS_TEST_PASSWORD:-fallback}}
insert_statement: INSERT INTO books VALUES (?, ?, ?)
batch_size: 100
column_types: [INTEGER, varchar, 3]
"#
    )
    .unwrap();

    let settings = SinkSettings::from_file(file.path()).unwrap();
    assert_eq!(settings.batch_size, 100);
    assert_eq!(
        settings.password.as_ref().map(SensitiveString::expose_secret),
        Some("fallback")
    );

    let writer = SinkBuilder::from_settings(&settings).finish().unwrap();
    let config = writer.config();
    assert_eq!(config.credentials, Some(Credentials::new("writer", "fallback")));
    assert_eq!(
        config.column_types,
        Some(vec![SqlType::Integer, SqlType::Varchar, SqlType::Decimal])
    );
}

#[test]
fn test_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"driver": "memory", "url": "jdbc:test", "insert_statement": "INSERT INTO t VALUES (?)"}}"#
    )
    .unwrap();

    let settings = SinkSettings::from_file(file.path()).unwrap();
    assert_eq!(settings.batch_size, DEFAULT_BATCH_SIZE);
    assert_eq!(settings.username, None);
}

#[test]
fn test_missing_file() {
    let err = SinkSettings::from_file("/nonexistent/sluice/sink.yaml").unwrap_err();
    assert!(matches!(err, SinkError::Configuration { .. }));
}

#[test]
fn test_unknown_type_name_rejected() {
    let yaml = r#"
driver: memory
url: jdbc:test
insert_statement: INSERT INTO t VALUES (?)
column_types: [VARCHAR2]
"#;
    let err = SinkSettings::from_yaml_str(yaml).unwrap_err();
    assert!(err.to_string().contains("VARCHAR2"));
}

#[test]
fn test_serialized_settings_hide_password() {
    let yaml = r#"
driver: memory
url: jdbc:test
password: hunter2
insert_statement: INSERT INTO t VALUES (?)
"#;
    let settings = SinkSettings::from_yaml_str(yaml).unwrap();
    let dumped = serde_json::to_string(&settings).unwrap();
    assert!(!dumped.contains("hunter2"));
    assert!(!format!("{settings:?}").contains("hunter2"));
}
