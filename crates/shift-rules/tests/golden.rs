//! Golden tests: rule files and expected outputs kept as JSON under
//! `tests/golden/`.

use std::path::PathBuf;

use serde_json::Value;
use shift_rules::{ApplyOptions, CompileOptions, RuleSet};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a golden JSON file from `tests/golden/`.
fn load_golden(filename: &str) -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/golden")
        .join(filename);
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read golden file {}: {}", path.display(), e));
    serde_json::from_str(&contents)
        .unwrap_or_else(|e| panic!("failed to parse golden file {}: {}", path.display(), e))
}

fn as_str(value: &Value) -> &str {
    value.as_str().unwrap_or_else(|| panic!("expected a string, got {value}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn golden_cases() {
    let golden = load_golden("cases.json");
    let cases = golden.as_array().expect("cases.json must be an array");
    assert!(!cases.is_empty());

    let options = ApplyOptions::default();
    let mut failures = Vec::new();
    for case in cases {
        let name = as_str(&case["name"]);
        let source: Vec<&str> = case["rules"]
            .as_array()
            .expect("rules must be an array")
            .iter()
            .map(as_str)
            .collect();
        let (set, diagnostics) = RuleSet::compile(&source.join("\n"), &CompileOptions::default());
        assert!(diagnostics.is_empty(), "{name}: {diagnostics:?}");

        for pair in case["words"].as_array().expect("words must be an array") {
            let word = as_str(&pair[0]);
            let expected = as_str(&pair[1]);
            let actual = set.apply(word, &options);
            if actual != expected {
                failures.push(format!("{name}: {word} -> {actual}, expected {expected}"));
            }
        }
    }
    assert!(failures.is_empty(), "golden mismatches:\n{}", failures.join("\n"));
}
