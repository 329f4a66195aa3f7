//! Output formatting for compile command results.

use super::execute::CompileResult;
use crate::compilers::ExecutionHints;
use crate::output::Outputable;

impl Outputable for CompileResult {
    fn to_table(&self) -> String {
        let compiled = &self.compiled;
        let mut lines = Vec::new();

        lines.push(format!("Collection: {} ({})", self.collection, compiled.backend));
        if !self.rql.is_empty() {
            lines.push(format!("RQL: {}", self.rql));
        }
        if compiled.dry_run {
            lines.push("Dry run: query is not executed".to_string());
        }
        lines.push(String::new());

        lines.push("Query:".to_string());
        for line in compiled.text.lines() {
            lines.push(format!("  {}", line));
        }

        if !compiled.bound_values.is_empty() {
            lines.push(String::new());
            lines.push(format!("Parameters ({}):", compiled.bound_values.len()));
            for bound in &compiled.bound_values {
                lines.push(format!("  {} = {}", bound.name, bound.value));
            }
        }

        lines.push(String::new());
        let page = &compiled.page;
        lines.push(format!(
            "Page: {} (size {}, offset {}, limit {})",
            page.page_num, page.page_size, page.offset, page.limit
        ));
        match &compiled.hints {
            ExecutionHints::Sql => {}
            ExecutionHints::Cosmos { enable_cross_partition } => {
                lines.push(format!("Cross-partition: {}", enable_cross_partition));
            }
            ExecutionHints::Elastic { strategy, resume_page } => {
                match resume_page {
                    Some(resume) => lines.push(format!(
                        "Paging: {} (resume after page {})",
                        strategy.name(),
                        resume
                    )),
                    None => lines.push(format!("Paging: {}", strategy.name())),
                }
            }
        }

        lines.join("\n")
    }
}
