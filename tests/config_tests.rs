// tests/config_tests.rs

use spl_toolkit::config::{
    Condition, ConditionKind, ConditionOperator, ConditionalRule, ConfigError, DataModelFieldMapping,
    DataModelMapping, FieldMapping, MappingConfig, load_mappings_json,
};
use spl_toolkit::{ContextValue, MappingContext, evaluate_mappings, validate_config};

fn context(pairs: &[(&str, ContextValue)]) -> MappingContext {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn rule(id: &str, conditions: Vec<Condition>, mappings: Vec<FieldMapping>) -> ConditionalRule {
    ConditionalRule {
        id: id.to_string(),
        conditions,
        mappings,
        enabled: true,
        ..ConditionalRule::default()
    }
}

fn web_config() -> MappingConfig {
    let mut config = MappingConfig::new("1.0");
    config.mappings = vec![FieldMapping::new("src_ip", "source_ip")];
    config.rules = vec![rule(
        "web",
        vec![Condition::sourcetype(ConditionOperator::Equals, "access_combined")],
        vec![FieldMapping::new("clientip", "source_address")],
    )];
    config
}

// ============================================================================
// Evaluation
// ============================================================================

#[test]
fn test_matching_rule_extends_base_mappings() {
    let ctx = context(&[("sourcetype", "access_combined".into())]);
    let result = evaluate_mappings(&web_config(), &ctx);
    assert_eq!(
        result,
        vec![
            FieldMapping::new("src_ip", "source_ip"),
            FieldMapping::new("clientip", "source_address"),
        ]
    );
}

#[test]
fn test_non_matching_rule_leaves_base_mappings() {
    let ctx = context(&[("sourcetype", "syslog".into())]);
    let result = evaluate_mappings(&web_config(), &ctx);
    assert_eq!(result, vec![FieldMapping::new("src_ip", "source_ip")]);

    let result = evaluate_mappings(&web_config(), &MappingContext::new());
    assert_eq!(result.len(), 1);
}

#[test]
fn test_sourcetype_list_matches_any() {
    let ctx = context(&[(
        "sourcetype",
        ContextValue::from_values(vec!["syslog".to_string(), "access_combined".to_string()]),
    )]);
    assert_eq!(evaluate_mappings(&web_config(), &ctx).len(), 2);
}

#[test]
fn test_source_contains_and_regex() {
    let mut config = MappingConfig::new("1.0");
    config.rules = vec![
        rule(
            "contains",
            vec![Condition::source(ConditionOperator::Contains, "/var/log")],
            vec![FieldMapping::new("a", "b")],
        ),
        rule(
            "regex",
            vec![Condition::source(ConditionOperator::Regex, r"secure$")],
            vec![FieldMapping::new("c", "d")],
        ),
    ];

    let ctx = context(&[("source", "/var/log/secure".into())]);
    assert_eq!(evaluate_mappings(&config, &ctx).len(), 2);

    let ctx = context(&[("source", "/opt/app/secure.bak".into())]);
    assert!(evaluate_mappings(&config, &ctx).is_empty());
}

#[test]
fn test_field_conditions() {
    let test_cases = vec![
        (Condition::field_exists("host", true), true),
        (Condition::field_exists("host", false), false),
        (Condition::field_exists("missing", false), true),
        (Condition::field_value("host", ConditionOperator::Equals, "web01"), true),
        (Condition::field_value("host", ConditionOperator::Equals, "web02"), false),
        (Condition::field_value("host", ConditionOperator::Contains, "web"), true),
        (Condition::field_value("host", ConditionOperator::Regex, r"^web\d+$"), true),
        (Condition::field_value("missing", ConditionOperator::Equals, "x"), false),
    ];

    let ctx = context(&[("host", "web01".into())]);
    for (condition, expected) in test_cases {
        let mut config = MappingConfig::new("1.0");
        config.rules = vec![rule("r", vec![condition.clone()], vec![FieldMapping::new("a", "b")])];
        assert_eq!(
            !evaluate_mappings(&config, &ctx).is_empty(),
            expected,
            "condition: {:?}",
            condition
        );
    }
}

#[test]
fn test_field_value_equals_list() {
    let ctx = context(&[(
        "index",
        ContextValue::from_values(vec!["main".to_string(), "security".to_string()]),
    )]);
    let mut config = MappingConfig::new("1.0");
    config.rules = vec![rule(
        "r",
        vec![Condition::field_value(
            "index",
            ConditionOperator::Equals,
            serde_json::json!(["main", "security"]),
        )],
        vec![FieldMapping::new("a", "b")],
    )];
    assert_eq!(evaluate_mappings(&config, &ctx).len(), 1);
}

#[test]
fn test_combination() {
    let and = Condition::combination(
        ConditionOperator::And,
        vec![
            Condition::sourcetype(ConditionOperator::Equals, "access_combined"),
            Condition::field_exists("clientip", true),
        ],
    );
    let or = Condition::combination(
        ConditionOperator::Or,
        vec![
            Condition::sourcetype(ConditionOperator::Equals, "syslog"),
            Condition::field_exists("clientip", true),
        ],
    );

    let mut config = MappingConfig::new("1.0");
    config.rules = vec![
        rule("and", vec![and], vec![FieldMapping::new("a", "b")]),
        rule("or", vec![or], vec![FieldMapping::new("c", "d")]),
    ];

    let ctx = context(&[("sourcetype", "access_combined".into())]);
    assert!(evaluate_mappings(&config, &ctx).is_empty());

    let ctx = context(&[
        ("sourcetype", "access_combined".into()),
        ("clientip", "1.2.3.4".into()),
    ]);
    assert_eq!(evaluate_mappings(&config, &ctx).len(), 2);
}

#[test]
fn test_disabled_rule_is_skipped() {
    let mut config = web_config();
    config.rules[0].enabled = false;
    let ctx = context(&[("sourcetype", "access_combined".into())]);
    assert_eq!(evaluate_mappings(&config, &ctx).len(), 1);
}

#[test]
fn test_rules_apply_in_declaration_order() {
    let condition = || Condition::field_exists("host", true);
    let mut config = MappingConfig::new("1.0");
    config.rules = vec![
        ConditionalRule {
            priority: 1,
            ..rule("low", vec![condition()], vec![FieldMapping::new("f", "first")])
        },
        ConditionalRule {
            priority: 100,
            ..rule("high", vec![condition()], vec![FieldMapping::new("f", "second")])
        },
    ];

    let ctx = context(&[("host", "a".into())]);
    let targets: Vec<String> = evaluate_mappings(&config, &ctx)
        .into_iter()
        .map(|m| m.target)
        .collect();
    assert_eq!(targets, vec!["first", "second"]);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_valid_config() {
    let result = validate_config(&web_config());
    assert!(result.valid);
    assert!(result.errors.is_empty());
}

#[test]
fn test_missing_version_and_mapping_fields() {
    let mut config = MappingConfig::default();
    config.mappings = vec![FieldMapping::new("", "x"), FieldMapping::new("y", "")];
    let result = config.validate();
    assert!(!result.valid);
    assert_eq!(
        result.errors,
        vec![
            "version is required",
            "mapping[0]: source field is required",
            "mapping[1]: target field is required",
        ]
    );
}

#[test]
fn test_rule_errors() {
    let mut config = MappingConfig::new("1.0");
    config.rules = vec![ConditionalRule::default()];
    assert_eq!(
        config.validate().errors,
        vec![
            "rule[0]: id is required",
            "rule[0]: at least one condition is required",
            "rule[0]: at least one mapping is required",
        ]
    );
}

#[test]
fn test_condition_errors() {
    let bad_type = Condition {
        kind: "severity".to_string(),
        ..Condition::default()
    };
    let bad_operator = Condition {
        operator: "starts_with".to_string(),
        ..Condition::sourcetype(ConditionOperator::Equals, "x")
    };
    let bad_regex = Condition::sourcetype(ConditionOperator::Regex, "(unclosed");
    let missing_field = Condition::field_exists("", true);
    let lonely = Condition::combination(ConditionOperator::And, vec![Condition::field_exists("a", true)]);
    let wrong_join = Condition::combination(
        ConditionOperator::Equals,
        vec![Condition::field_exists("a", true), Condition::field_exists("b", true)],
    );
    let bad_child = Condition::combination(
        ConditionOperator::Or,
        vec![Condition::field_exists("a", true), Condition::field_exists("", true)],
    );

    let mut config = MappingConfig::new("1.0");
    config.rules = vec![rule(
        "r",
        vec![bad_type, bad_operator, bad_regex, missing_field, lonely, wrong_join, bad_child],
        vec![FieldMapping::new("a", "b")],
    )];

    let errors = config.validate().errors;
    assert_eq!(errors.len(), 7);
    assert_eq!(errors[0], "rule[0].condition[0]: invalid condition type: severity");
    assert_eq!(errors[1], "rule[0].condition[1]: invalid operator: starts_with");
    assert!(errors[2].starts_with("rule[0].condition[2]: invalid regex pattern: "));
    assert_eq!(errors[3], "rule[0].condition[3]: field is required for type field_exists");
    assert_eq!(
        errors[4],
        "rule[0].condition[4]: combination conditions require at least 2 children"
    );
    assert_eq!(
        errors[5],
        "rule[0].condition[5]: combination conditions require 'and' or 'or' operator"
    );
    assert_eq!(
        errors[6],
        "rule[0].condition[6]: child[1]: field is required for type field_exists"
    );
}

#[test]
fn test_datamodel_errors() {
    let mut config = MappingConfig::new("1.0");
    config.datamodels = vec![DataModelMapping {
        field_mappings: vec![DataModelFieldMapping::default()],
        conditional_mappings: vec![ConditionalRule {
            id: "dm".to_string(),
            ..ConditionalRule::default()
        }],
        ..DataModelMapping::default()
    }];

    let errors = config.validate().errors;
    assert_eq!(
        errors,
        vec![
            "datamodel[0]: source_datamodel is required",
            "datamodel[0]: target_datamodel is required",
            "datamodel[0].field_mapping[0]: source_field is required",
            "datamodel[0].field_mapping[0]: target_field is required",
            "datamodel[0].rule[0]: at least one condition is required",
            "datamodel[0].rule[0]: at least one mapping is required",
        ]
    );
}

// ============================================================================
// JSON
// ============================================================================

const CONFIG_JSON: &str = r#"{
  "version": "1.0",
  "name": "web",
  "mappings": [{ "source": "src_ip", "target": "source_ip" }],
  "rules": [{
    "id": "web",
    "conditions": [{ "type": "sourcetype", "operator": "equals", "value": "access_combined" }],
    "mappings": [{ "source": "clientip", "target": "source_address" }],
    "priority": 10,
    "enabled": true
  }]
}"#;

#[test]
fn test_load_from_json() {
    let config = MappingConfig::from_json_str(CONFIG_JSON).unwrap();
    assert_eq!(config.name, "web");
    assert_eq!(config.rules[0].priority, 10);
    assert_eq!(
        config.rules[0].conditions[0].condition_kind(),
        Some(ConditionKind::SourceType)
    );
}

#[test]
fn test_json_round_trip() {
    let config = MappingConfig::from_json_str(CONFIG_JSON).unwrap();
    let again = MappingConfig::from_json_str(&config.to_json().unwrap()).unwrap();
    assert_eq!(config, again);
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = MappingConfig::from_json_str(r#"{ "mappings": [] }"#).unwrap_err();
    match &err {
        ConfigError::Invalid { errors } => assert_eq!(errors, &vec!["version is required"]),
        other => panic!("Expected invalid config, got {:?}", other),
    }
    assert_eq!(err.to_string(), "invalid mapping config: version is required");
}

#[test]
fn test_malformed_json() {
    assert!(matches!(
        MappingConfig::from_json_str("{ not json"),
        Err(ConfigError::Json(_))
    ));
    assert!(matches!(
        MappingConfig::from_json_file("/nonexistent/spl-toolkit/config.json"),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn test_mapping_list() {
    let mappings = load_mappings_json(r#"[{"source":"a","target":"b"},{"source":"c","target":"d"}]"#).unwrap();
    assert_eq!(mappings, vec![FieldMapping::new("a", "b"), FieldMapping::new("c", "d")]);
}
