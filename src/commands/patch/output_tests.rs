//! Output formatting tests for patch command.

#[cfg(test)]
mod tests {
    use super::super::execute::PatchResult;
    use crate::document::Node;
    use rstest::{fixture, rstest};
    use serde_json::json;

    const PATCHED_TABLE: &str = "\
Applied 2 operation(s) to order.json

{
  \"name\": \"Lyon\",
  \"tags\": [
    \"a\"
  ]
}";

    #[fixture]
    fn patched_result() -> PatchResult {
        PatchResult {
            doc: "order.json".to_string(),
            applied: 2,
            document: Node::from_json(json!({"name": "Lyon", "tags": ["a"]})).unwrap(),
        }
    }

    crate::output_table_test! {
        test_name: test_to_table,
        fixture: patched_result,
        fixture_type: PatchResult,
        expected: PATCHED_TABLE,
    }

    crate::output_json_test! {
        test_name: test_format_json,
        fixture: patched_result,
        fixture_type: PatchResult,
        assertions: {
            "doc": "order.json",
            "applied": 2,
            "document": json!({"name": "Lyon", "tags": ["a"]}),
        },
    }

    crate::output_toon_test! {
        test_name: test_format_toon,
        fixture: patched_result,
        fixture_type: PatchResult,
        contains: ["doc: order.json", "applied: 2"],
    }
}
