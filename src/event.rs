use serde::Deserialize;
use thiserror::Error;

/// Marker the test runner prints once a test has already passed.
pub const PASS_MARKER: &str = "--- PASS:";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("line is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Start,
    Run,
    Pause,
    Cont,
    Output,
    Pass,
    Fail,
    Skip,
    Bench,
    #[serde(other)]
    Unknown,
}

impl Action {
    pub fn is_terminal(self) -> bool {
        matches!(self, Action::Pass | Action::Fail | Action::Skip)
    }
}

impl Default for Action {
    fn default() -> Self { Action::Unknown }
}

/// One decoded line of `go test -json` output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "Time", default)]
    pub time: String,
    #[serde(rename = "Action", default)]
    pub action: Action,
    #[serde(rename = "Package", default)]
    pub group: String,
    #[serde(rename = "Test", default)]
    pub test: String,
    #[serde(rename = "Elapsed", default)]
    pub elapsed: f64,
    #[serde(rename = "Output", default)]
    pub output: String,
}

impl EventRecord {
    /// Informational lines (package build output, summaries) carry no test name.
    pub fn is_test_event(&self) -> bool {
        !self.test.is_empty()
    }
}

/// Decode one raw input line. A trailing `\r` is ignored.
pub fn parse_line(line: &[u8]) -> Result<EventRecord, DecodeError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = std::str::from_utf8(line)?;
    let mut rec: EventRecord = serde_json::from_str(text)?;
    rec.output = normalize_output(rec.output);
    Ok(rec)
}

/// Fragments announcing an already-passed test lose their surrounding
/// whitespace; every other fragment is kept byte for byte.
pub fn normalize_output(output: String) -> String {
    if output.contains(PASS_MARKER) {
        output.trim().to_string()
    } else {
        output
    }
}
