//! Terminal-backed refresh decisions.

use std::io::{BufRead, Write};

use assetq_core::RefreshDecider;

/// How a non-empty cache is treated by `assetq query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Ask on the terminal.
    Prompt,
    Always,
    Never,
}

impl RefreshPolicy {
    pub fn from_flags(refresh: bool, reuse: bool) -> Self {
        match (refresh, reuse) {
            (true, _) => RefreshPolicy::Always,
            (_, true) => RefreshPolicy::Never,
            _ => RefreshPolicy::Prompt,
        }
    }
}

impl RefreshDecider for RefreshPolicy {
    fn should_refresh(&self, existing_rows: usize) -> bool {
        match self {
            RefreshPolicy::Always => true,
            RefreshPolicy::Never => false,
            RefreshPolicy::Prompt => {
                let stdin = std::io::stdin();
                ask(&mut stdin.lock(), &mut std::io::stderr(), existing_rows)
            }
        }
    }
}

/// Ask whether to re-run the query. Only an answer of `y` means yes; read
/// failures mean reuse.
fn ask(input: &mut impl BufRead, output: &mut impl Write, existing_rows: usize) -> bool {
    let _ = write!(output, "Found {existing_rows} cached assets. Re-run the asset query? [y/n]: ");
    let _ = output.flush();

    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
        Err(e) => {
            tracing::warn!(error = %e, "could not read answer; reusing cache");
            false
        }
    }
}
