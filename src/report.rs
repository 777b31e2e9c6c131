use crate::aggregator::{TestEntry, TestKey, TestState};
use crate::resolver::GroupLocationIndex;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_GROUP_SIZE: usize = 20;

/// How sorted entries are bucketed into display groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingPolicy {
    /// Consecutive windows of at most `n` entries, ordered by test name.
    Window(usize),
    /// One display group per source group, ordered by group then test name.
    ByGroup,
}

impl Default for GroupingPolicy {
    fn default() -> Self { GroupingPolicy::Window(DEFAULT_GROUP_SIZE) }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayGroup {
    pub failed: bool,
    pub skipped: bool,
    pub tests: Vec<TestEntry>,
}

impl DisplayGroup {
    fn new(tests: Vec<TestEntry>) -> Self {
        let mut group = Self { failed: false, skipped: false, tests };
        group.refresh_flags();
        group
    }

    fn refresh_flags(&mut self) {
        self.failed = self.tests.iter().any(|t| t.state == TestState::Failed);
        self.skipped = self.tests.iter().any(|t| t.state == TestState::Skipped);
    }
}

/// `total` counts terminal entries only; `total + unknown` is the entry count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unknown: usize,
    pub total: usize,
}

impl Summary {
    fn tally<'a>(entries: impl IntoIterator<Item = &'a TestEntry>) -> Self {
        let mut s = Summary::default();
        for e in entries {
            match e.state {
                TestState::Passed => s.passed += 1,
                TestState::Failed => s.failed += 1,
                TestState::Skipped => s.skipped += 1,
                TestState::Unknown => s.unknown += 1,
            }
        }
        s.total = s.passed + s.failed + s.skipped;
        s
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportModel {
    pub groups: Vec<DisplayGroup>,
    pub summary: Summary,
    /// Wall-clock time of the read-and-resolve phase, whole milliseconds.
    pub duration_ms: u64,
}

impl ReportModel {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TestEntry> {
        self.groups.iter().flat_map(|g| g.tests.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.tests.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold a freshly assembled batch into this model. Existing entries keep
    /// their place; a batch entry with a known (group, name) replaces it,
    /// the rest are appended as new display groups.
    pub fn append(&mut self, batch: ReportModel) {
        let mut positions: HashMap<TestKey, (usize, usize)> = HashMap::new();
        for (gi, group) in self.groups.iter().enumerate() {
            for (ti, test) in group.tests.iter().enumerate() {
                positions.insert(test.key(), (gi, ti));
            }
        }

        let mut fresh_groups = Vec::new();
        for mut group in batch.groups {
            group.tests.retain(|test| match positions.get(&test.key()) {
                Some(&(gi, ti)) => {
                    self.groups[gi].tests[ti] = test.clone();
                    false
                }
                None => true,
            });
            if !group.tests.is_empty() {
                fresh_groups.push(group);
            }
        }
        self.groups.extend(fresh_groups);

        for group in &mut self.groups {
            group.refresh_flags();
        }
        self.summary = Summary::tally(self.entries());
        self.duration_ms += batch.duration_ms;
    }
}

/// Round to the nearest millisecond.
pub fn round_to_millis(d: Duration) -> u64 {
    ((d.as_micros() + 500) / 1000) as u64
}

/// Sort, annotate with locations, and partition aggregated entries.
pub fn assemble(
    entries: impl IntoIterator<Item = TestEntry>,
    index: &GroupLocationIndex,
    policy: GroupingPolicy,
    duration: Duration,
) -> ReportModel {
    let mut entries: Vec<TestEntry> = entries.into_iter().collect();
    match policy {
        GroupingPolicy::Window(_) => entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.group.cmp(&b.group))),
        GroupingPolicy::ByGroup => entries.sort_by(|a, b| a.group.cmp(&b.group).then_with(|| a.name.cmp(&b.name))),
    }
    for entry in &mut entries {
        entry.location = index.lookup(&entry.group, &entry.name).cloned();
    }

    let summary = Summary::tally(&entries);
    let groups = partition(entries, policy);
    ReportModel { groups, summary, duration_ms: round_to_millis(duration) }
}

/// Split already-ordered entries into display groups.
pub fn partition(entries: Vec<TestEntry>, policy: GroupingPolicy) -> Vec<DisplayGroup> {
    match policy {
        GroupingPolicy::Window(n) => entries
            .into_iter()
            .chunks(n.max(1))
            .into_iter()
            .map(|chunk| DisplayGroup::new(chunk.collect()))
            .collect(),
        GroupingPolicy::ByGroup => entries
            .into_iter()
            .chunk_by(|e| e.group.clone())
            .into_iter()
            .map(|(_, chunk)| DisplayGroup::new(chunk.collect()))
            .collect(),
    }
}
