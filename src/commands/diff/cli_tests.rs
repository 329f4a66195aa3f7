//! CLI parsing tests for diff command using the test DSL.

#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use clap::Parser;
    use rstest::rstest;
    use std::path::PathBuf;

    crate::cli_required_arg_test! {
        command: "diff",
        test_name: test_requires_from,
        args: ["--to", "after.json"],
        required_arg: "--from",
    }

    crate::cli_required_arg_test! {
        command: "diff",
        test_name: test_requires_to,
        args: ["--from", "before.json"],
        required_arg: "--to",
    }

    crate::cli_option_test! {
        command: "diff",
        variant: Diff,
        test_name: test_with_from,
        args: ["--from", "before.json", "--to", "after.json"],
        field: from,
        expected: PathBuf::from("before.json"),
    }

    crate::cli_option_test! {
        command: "diff",
        variant: Diff,
        test_name: test_with_short_flags,
        args: ["-f", "before.json", "-t", "after.json"],
        field: to,
        expected: PathBuf::from("after.json"),
    }
}
