//! Output formatting tests for diff command.

#[cfg(test)]
mod tests {
    use super::super::execute::DiffResult;
    use crate::document::{PatchKind, PatchOp, Value};
    use rstest::{fixture, rstest};
    use serde_json::json;

    // =========================================================================
    // Expected outputs
    // =========================================================================

    const EMPTY_TABLE: &str = "\
Diff: before.json -> after.json

Documents are identical.";

    const CHANGES_TABLE: &str = "\
Diff: before.json -> after.json

Found 3 operation(s):
  replace name = \"Lyon\"
  add tags = [\"a\",1]
  remove old";

    // =========================================================================
    // Fixtures
    // =========================================================================

    #[fixture]
    fn empty_result() -> DiffResult {
        DiffResult {
            from: "before.json".to_string(),
            to: "after.json".to_string(),
            operations: vec![],
        }
    }

    #[fixture]
    fn changes_result() -> DiffResult {
        DiffResult {
            from: "before.json".to_string(),
            to: "after.json".to_string(),
            operations: vec![
                PatchOp { op: PatchKind::Replace, path: "name".to_string(), value: Some(Value::from("Lyon")) },
                PatchOp {
                    op: PatchKind::Add,
                    path: "tags".to_string(),
                    value: Some(Value::from_json(json!(["a", 1]))),
                },
                PatchOp { op: PatchKind::Remove, path: "old".to_string(), value: None },
            ],
        }
    }

    // =========================================================================
    // Table format tests
    // =========================================================================

    crate::output_table_test! {
        test_name: test_to_table_empty,
        fixture: empty_result,
        fixture_type: DiffResult,
        expected: EMPTY_TABLE,
    }

    crate::output_table_test! {
        test_name: test_to_table_changes,
        fixture: changes_result,
        fixture_type: DiffResult,
        expected: CHANGES_TABLE,
    }

    // =========================================================================
    // JSON format tests
    // =========================================================================

    crate::output_json_test! {
        test_name: test_format_json,
        fixture: changes_result,
        fixture_type: DiffResult,
        assertions: {
            "from": "before.json",
            "operations": json!([
                { "op": "replace", "path": "name", "value": "Lyon" },
                { "op": "add", "path": "tags", "value": ["a", 1] },
                { "op": "remove", "path": "old" },
            ]),
        },
    }

    crate::output_toon_test! {
        test_name: test_format_toon,
        fixture: empty_result,
        fixture_type: DiffResult,
        contains: ["from: before.json", "to: after.json"],
    }
}
