// tests/cli_tests.rs
#![cfg(feature = "cli")]

use spl_toolkit::MAX_QUERY_LEN;
use spl_toolkit::cli::{
    CliError, DiscoverOptions, MapOptions, ValidateResult, execute_check_config, execute_discover,
    execute_map, execute_parse, execute_validate,
};
use std::fs;
use std::path::PathBuf;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("spl-toolkit-{}-{}", std::process::id(), name));
    fs::write(&path, contents).unwrap();
    path
}

const CONFIG_JSON: &str = r#"{
  "version": "1.0",
  "mappings": [{ "source": "src_ip", "target": "source_ip" }],
  "rules": [{
    "id": "web",
    "conditions": [{ "type": "sourcetype", "operator": "equals", "value": "access_combined" }],
    "mappings": [{ "source": "clientip", "target": "source_address" }],
    "enabled": true
  }]
}"#;

// ============================================================================
// map
// ============================================================================

#[test]
fn test_map_with_mapping_file() {
    let mappings = temp_file(
        "mappings.json",
        r#"[{"source": "src_ip", "target": "source_ip"}]"#,
    );
    let options = MapOptions {
        query: "search src_ip=10.0.0.1 | stats count by src_ip".to_string(),
        mappings: Some(mappings.clone()),
        ..MapOptions::default()
    };
    assert_eq!(
        execute_map(&options).unwrap(),
        "search source_ip=10.0.0.1 | stats count by source_ip"
    );
    fs::remove_file(mappings).ok();
}

#[test]
fn test_map_with_config_and_context() {
    let config = temp_file("config.json", CONFIG_JSON);
    let query = "search clientip=1.2.3.4".to_string();

    let detected = MapOptions {
        query: query.clone(),
        config: Some(config.clone()),
        ..MapOptions::default()
    };
    // no sourcetype in the query, so the rule does not fire
    assert_eq!(execute_map(&detected).unwrap(), "search clientip=1.2.3.4");

    let explicit = MapOptions {
        context: vec!["sourcetype=syslog,access_combined".to_string()],
        ..detected
    };
    assert_eq!(execute_map(&explicit).unwrap(), "search source_address=1.2.3.4");
    fs::remove_file(config).ok();
}

#[test]
fn test_map_errors() {
    let options = MapOptions {
        query: "search a=1 | | stats".to_string(),
        ..MapOptions::default()
    };
    assert!(matches!(execute_map(&options), Err(CliError::Parse(_))));

    let options = MapOptions {
        query: "search a=1".to_string(),
        context: vec!["sourcetype".to_string()],
        ..MapOptions::default()
    };
    assert!(matches!(execute_map(&options), Err(CliError::InvalidContext(_))));

    let options = MapOptions {
        query: "search a=1".to_string(),
        config: Some(PathBuf::from("/nonexistent/spl-toolkit/config.json")),
        ..MapOptions::default()
    };
    assert!(matches!(execute_map(&options), Err(CliError::Config(_))));
}

#[test]
fn test_query_length_limit() {
    let options = MapOptions {
        query: format!("search a={}", "x".repeat(MAX_QUERY_LEN)),
        ..MapOptions::default()
    };
    match execute_map(&options) {
        Err(CliError::QueryTooLong(len)) => assert!(len > MAX_QUERY_LEN),
        other => panic!("Expected QueryTooLong, got {:?}", other),
    }
}

// ============================================================================
// discover, parse, validate
// ============================================================================

#[test]
fn test_discover_json() {
    let options = DiscoverOptions {
        query: "| inputlookup ip_geo_lookup.csv | search country=US".to_string(),
        pretty: false,
    };
    let json: serde_json::Value = serde_json::from_str(&execute_discover(&options).unwrap()).unwrap();
    assert_eq!(json["lookups"], serde_json::json!(["ip_geo_lookup"]));
    assert_eq!(json["input_fields"], serde_json::json!(["country"]));
}

#[test]
fn test_parse_json_pretty() {
    let options = DiscoverOptions {
        query: "search a=1".to_string(),
        pretty: true,
    };
    let output = execute_parse(&options).unwrap();
    assert!(output.contains('\n'));
    assert!(output.contains("\"type\": \"query\""));
}

#[test]
fn test_validate() {
    assert!(matches!(
        execute_validate("search a=1").unwrap(),
        ValidateResult::Valid
    ));

    match execute_validate("search a=1 )").unwrap() {
        ValidateResult::Invalid(errors) => {
            assert_eq!(errors, vec!["line 1:12 mismatched input ')' expecting {'|', <EOF>}"]);
        }
        ValidateResult::Valid => panic!("Expected errors"),
    }
}

#[test]
fn test_check_config_reports_all_errors() {
    let path = temp_file(
        "invalid.json",
        r#"{ "mappings": [{ "source": "a" }], "rules": [{ "id": "r" }] }"#,
    );
    let result = execute_check_config(&path).unwrap();
    assert!(!result.valid);
    assert_eq!(
        result.errors,
        vec![
            "version is required",
            "mapping[0]: target field is required",
            "rule[0]: at least one condition is required",
            "rule[0]: at least one mapping is required",
        ]
    );
    fs::remove_file(path).ok();
}

#[test]
fn test_error_messages() {
    assert_eq!(
        CliError::InvalidContext("x".to_string()).to_string(),
        "Invalid context 'x': expected key=value"
    );
    assert!(CliError::NoInput.to_string().starts_with("No query provided"));
}
