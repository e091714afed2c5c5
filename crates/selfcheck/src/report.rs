use std::{fmt, time::Duration};

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Skip,
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Skip => "SKIP",
            Self::Fail => "FAIL",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelfCheckRow {
    pub tool: String,
    pub status: CheckStatus,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub detail: String,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub pass: usize,
    pub skip: usize,
    pub fail: usize,
}

impl Summary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.pass + self.skip + self.fail
    }

    #[must_use]
    pub fn all_passed_or_skipped(&self) -> bool {
        self.fail == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tools: {} passed, {} skipped, {} failed",
            self.total(),
            self.pass,
            self.skip,
            self.fail
        )
    }
}

#[must_use]
pub fn summarize(rows: &[SelfCheckRow]) -> Summary {
    rows.iter().fold(Summary::default(), |mut s, row| {
        match row.status {
            CheckStatus::Pass => s.pass += 1,
            CheckStatus::Skip => s.skip += 1,
            CheckStatus::Fail => s.fail += 1,
        }
        s
    })
}

/// Fixed-width text table followed by the summary line.
#[must_use]
pub fn render_table(rows: &[SelfCheckRow]) -> String {
    let tool_w = rows
        .iter()
        .map(|r| r.tool.len())
        .chain(std::iter::once("TOOL".len()))
        .max()
        .unwrap_or_default();

    let mut out = format!("{:<tool_w$}  {:<6}  {:>8}  DETAIL\n", "TOOL", "STATUS", "ELAPSED");
    for row in rows {
        let elapsed = format!("{}ms", row.elapsed.as_millis());
        out.push_str(&format!(
            "{:<tool_w$}  {:<6}  {:>8}  {}\n",
            row.tool,
            row.status.to_string(),
            elapsed,
            row.detail
        ));
    }
    out.push_str(&summarize(rows).to_string());
    out.push('\n');
    out
}
