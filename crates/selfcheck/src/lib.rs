//! Unattended smoke test over the whole tool catalog.
//!
//! Every tool is invoked once with placeholder arguments under a hard
//! deadline. Consent prompts raised along the way are denied and file picks
//! canceled, so the run never waits on a human.

mod harness;
mod report;

pub use {
    harness::{SelfCheck, classify, synthesize_arguments},
    report::{CheckStatus, SelfCheckRow, Summary, render_table, summarize},
};
