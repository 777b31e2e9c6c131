use crate::event::{self, Action, EventRecord};
use crate::resolver::SourceLocation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io::{self, BufRead, Write};

/// Identity of a test: the same name in two groups is two tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestKey {
    pub group: String,
    pub name: String,
}

impl TestKey {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self { group: group.into(), name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestState {
    Passed,
    Failed,
    Skipped,
    /// The stream ended before a terminal action arrived.
    #[default]
    Unknown,
}

impl TestState {
    fn from_action(action: Action) -> Option<Self> {
        match action {
            Action::Pass => Some(TestState::Passed),
            Action::Fail => Some(TestState::Failed),
            Action::Skip => Some(TestState::Skipped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEntry {
    pub name: String,
    pub group: String,
    pub elapsed: f64,
    pub output: Vec<String>,
    pub state: TestState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl TestEntry {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            elapsed: 0.0,
            output: Vec::new(),
            state: TestState::Unknown,
            location: None,
        }
    }

    pub fn key(&self) -> TestKey {
        TestKey::new(self.group.clone(), self.name.clone())
    }
}

/// Everything folded out of one input stream.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub entries: HashMap<TestKey, TestEntry>,
    pub groups: BTreeSet<String>,
    pub lines_read: usize,
    pub skipped_lines: usize,
}

#[derive(Default)]
pub struct Aggregator {
    out: Aggregation,
}

impl Aggregator {
    pub fn new() -> Self { Self::default() }

    /// Decode and fold one raw line. Malformed lines are counted and skipped.
    pub fn push_line(&mut self, line: &[u8]) {
        self.out.lines_read += 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        match event::parse_line(line) {
            Ok(rec) => self.push(rec),
            Err(e) => {
                self.out.skipped_lines += 1;
                tracing::warn!(line = self.out.lines_read, error = %e, "skipping undecodable input line");
            }
        }
    }

    pub fn push(&mut self, rec: EventRecord) {
        if !rec.group.is_empty() && !self.out.groups.contains(&rec.group) {
            self.out.groups.insert(rec.group.clone());
        }
        if !rec.is_test_event() {
            return;
        }
        let key = TestKey::new(rec.group, rec.test);
        let entry = self
            .out
            .entries
            .entry(key)
            .or_insert_with_key(|k| TestEntry::new(k.group.clone(), k.name.clone()));
        if let Some(state) = TestState::from_action(rec.action) {
            entry.state = state;
            entry.elapsed = rec.elapsed;
        }
        entry.output.push(rec.output);
    }

    pub fn finish(self) -> Aggregation {
        self.out
    }
}

/// Fold a whole stream, echoing every raw line to `echo` when given.
pub fn aggregate_reader<R: BufRead>(
    mut reader: R,
    mut echo: Option<&mut dyn Write>,
) -> io::Result<Aggregation> {
    let mut agg = Aggregator::new();
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = buf.strip_suffix(b"\n").unwrap_or(&buf);
        if let Some(w) = echo.as_deref_mut() {
            w.write_all(line)?;
            w.write_all(b"\n")?;
        }
        agg.push_line(line);
    }
    Ok(agg.finish())
}
