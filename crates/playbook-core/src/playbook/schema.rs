//! JSON Schema validation for rule lists.
//!
//! Rule lists are validated against schemas/rules.schema.json, embedded at
//! compile time.

use std::sync::OnceLock;

use serde_json::Value;

const RULES_SCHEMA_JSON: &str = include_str!("../../../../schemas/rules.schema.json");

static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    COMPILED_SCHEMA
        .get_or_init(|| {
            let schema_value: Value = serde_json::from_str(RULES_SCHEMA_JSON)
                .map_err(|e| format!("Invalid schema JSON: {}", e))?;
            jsonschema::options()
                .build(&schema_value)
                .map_err(|e| format!("Failed to compile schema: {}", e))
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Validate a rule list against the schema.
///
/// Returns every violation, each suffixed with its instance path.
pub fn validate_rules_schema(rules: &Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(rules)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check a rule list against the schema without collecting messages.
pub fn is_valid_rules(rules: &Value) -> bool {
    get_validator()
        .map(|v| v.is_valid(rules))
        .unwrap_or(false)
}
