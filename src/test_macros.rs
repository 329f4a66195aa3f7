//! Declarative macros for generating tests.
//!
//! Instead of writing repetitive test functions, declare the test cases and
//! let the macro generate the actual test code. Generated tests use `rstest`,
//! so the calling module must import it.

// =============================================================================
// CLI Test Macros
// =============================================================================

/// Generate a single CLI option test.
///
/// # Example
///
/// ```ignore
/// cli_option_test! {
///     command: "compile",
///     variant: Compile,
///     test_name: test_with_backend,
///     args: ["--collection", "orders", "--backend", "cosmos"],
///     field: backend,
///     expected: Some(BackendKind::Cosmos),
/// }
/// ```
#[macro_export]
macro_rules! cli_option_test {
    (
        command: $cmd:literal,
        variant: $variant:ident,
        test_name: $test_name:ident,
        args: [$($arg:literal),+],
        field: $($field:ident).+,
        expected: $expected:expr $(,)?
    ) => {
        #[rstest]
        fn $test_name() {
            let args = Args::try_parse_from([
                "rql_gateway",
                $cmd,
                $($arg),+
            ]).unwrap();
            match args.command {
                crate::commands::Command::$variant(cmd) => {
                    assert_eq!(cmd.$($field).+, $expected,
                        concat!("Field ", stringify!($($field).+), " mismatch"));
                }
                #[allow(unreachable_patterns)]
                _ => panic!(concat!("Expected ", stringify!($variant), " command")),
            }
        }
    };
}

/// Generate a test that verifies a command fails without a required argument.
///
/// # Example
///
/// ```ignore
/// cli_required_arg_test! {
///     command: "diff",
///     test_name: test_requires_from,
///     args: ["--to", "b.json"],
///     required_arg: "--from",
/// }
/// ```
#[macro_export]
macro_rules! cli_required_arg_test {
    (
        command: $cmd:literal,
        test_name: $test_name:ident,
        args: [$($arg:literal),*],
        required_arg: $required:literal $(,)?
    ) => {
        #[rstest]
        fn $test_name() {
            let result = Args::try_parse_from(["rql_gateway", $cmd $(, $arg)*]);
            assert!(result.is_err(), concat!("Command should require ", $required));
            assert!(
                result.unwrap_err().to_string().contains($required),
                concat!("Error should mention ", $required)
            );
        }
    };
    (
        command: $cmd:literal,
        test_name: $test_name:ident,
        required_arg: $required:literal $(,)?
    ) => {
        $crate::cli_required_arg_test! {
            command: $cmd,
            test_name: $test_name,
            args: [],
            required_arg: $required,
        }
    };
}

/// Generate a test that verifies parsing fails with specific invalid args.
#[macro_export]
macro_rules! cli_error_test {
    (
        command: $cmd:literal,
        test_name: $test_name:ident,
        args: [$($arg:literal),+] $(,)?
    ) => {
        #[rstest]
        fn $test_name() {
            let result = Args::try_parse_from([
                "rql_gateway",
                $cmd,
                $($arg),+
            ]);
            assert!(result.is_err());
        }
    };
}

// =============================================================================
// Compile Test Macros
// =============================================================================

/// Generate a test that compiles RQL against a collection and checks the text.
///
/// # Example
///
/// ```ignore
/// compile_test! {
///     test_name: test_eq,
///     collection: fixtures::orders(),
///     backend: SqlCompiler::default(),
///     rql: "eq(shipCity,Reims)",
///     text: r#"SELECT * FROM "orders" WHERE "orders"."shipCity" = ? ..."#,
/// }
/// ```
#[macro_export]
macro_rules! compile_test {
    (
        test_name: $test_name:ident,
        collection: $collection:expr,
        backend: $backend:expr,
        rql: $rql:expr,
        text: $expected:expr $(,)?
    ) => {
        #[rstest]
        fn $test_name() {
            use $crate::compilers::Compiler;
            let collection = $collection;
            let query = $crate::query::Query::parse(&collection, $rql).expect("RQL should parse");
            let compiled = $backend.compile(&query).expect("query should compile");
            assert_eq!(compiled.text, $expected);
        }
    };
}

/// Generate a test that expects parsing or compilation to fail.
///
/// The error message must contain `contains`.
#[macro_export]
macro_rules! compile_error_test {
    (
        test_name: $test_name:ident,
        collection: $collection:expr,
        backend: $backend:expr,
        rql: $rql:expr,
        contains: $needle:expr $(,)?
    ) => {
        #[rstest]
        fn $test_name() {
            use $crate::compilers::Compiler;
            let collection = $collection;
            let backend = $backend;
            let result = $crate::query::Query::parse(&collection, $rql)
                .and_then(|query| backend.compile(&query));
            let err = result.expect_err("query should be rejected");
            assert!(
                err.to_string().contains($needle),
                "error '{}' should contain '{}'",
                err,
                $needle
            );
        }
    };
}

// =============================================================================
// Output Test Macros
// =============================================================================

/// Generate a test that verifies table output matches expected string.
///
/// Works with rstest fixtures by accepting a fixture parameter.
///
/// # Example
/// ```ignore
/// output_table_test! {
///     test_name: test_to_table_sql,
///     fixture: sql_result,
///     fixture_type: CompileResult,
///     expected: SQL_TABLE,
/// }
/// ```
#[macro_export]
macro_rules! output_table_test {
    // With format parameter (Json, Toon)
    (
        test_name: $test_name:ident,
        fixture: $fixture:ident,
        fixture_type: $fixture_type:ty,
        expected: $expected:expr,
        format: $format:ident $(,)?
    ) => {
        #[rstest]
        fn $test_name($fixture: $fixture_type) {
            use $crate::output::{Outputable, OutputFormat};
            assert_eq!($fixture.format(OutputFormat::$format), $expected);
        }
    };
    // Default table format
    (
        test_name: $test_name:ident,
        fixture: $fixture:ident,
        fixture_type: $fixture_type:ty,
        expected: $expected:expr $(,)?
    ) => {
        #[rstest]
        fn $test_name($fixture: $fixture_type) {
            use $crate::output::Outputable;
            assert_eq!($fixture.to_table(), $expected);
        }
    };
}

/// Generate a test that verifies JSON output is valid and contains expected fields.
#[macro_export]
macro_rules! output_json_test {
    (
        test_name: $test_name:ident,
        fixture: $fixture:ident,
        fixture_type: $fixture_type:ty,
        assertions: { $($field:literal : $expected:expr),* $(,)? } $(,)?
    ) => {
        #[rstest]
        fn $test_name($fixture: $fixture_type) {
            use $crate::output::{Outputable, OutputFormat};
            let output = $fixture.format(OutputFormat::Json);
            let parsed: serde_json::Value = serde_json::from_str(&output)
                .expect("Should produce valid JSON");
            $(
                assert_eq!(parsed[$field], $expected, concat!("JSON field mismatch: ", $field));
            )*
        }
    };
}

/// Generate a test that verifies Toon output contains expected strings.
#[macro_export]
macro_rules! output_toon_test {
    (
        test_name: $test_name:ident,
        fixture: $fixture:ident,
        fixture_type: $fixture_type:ty,
        contains: [$($needle:literal),* $(,)?] $(,)?
    ) => {
        #[rstest]
        fn $test_name($fixture: $fixture_type) {
            use $crate::output::{Outputable, OutputFormat};
            let output = $fixture.format(OutputFormat::Toon);
            $(
                assert!(output.contains($needle), concat!("Toon output should contain: ", $needle));
            )*
        }
    };
}
