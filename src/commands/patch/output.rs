//! Output formatting for patch command results.

use super::execute::PatchResult;
use crate::output::Outputable;

impl Outputable for PatchResult {
    fn to_table(&self) -> String {
        format!(
            "Applied {} operation(s) to {}\n\n{}",
            self.applied,
            self.doc,
            self.document.to_json(true)
        )
    }
}
