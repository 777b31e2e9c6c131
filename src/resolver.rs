use crate::metadata::{MetadataQuery, PackageListing};
use crate::source::SourceParser;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Group reported for tests run directly against files (`go test foo_test.go`).
pub const AD_HOC_GROUP: &str = "command-line-arguments";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("metadata query for `{group}` failed: {reason}")]
    Query { group: String, reason: String },
    #[error("metadata query for `{group}` timed out after {timeout:?}")]
    Timeout { group: String, timeout: Duration },
    #[error("invalid metadata for `{group}`: {source}")]
    Metadata {
        group: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Parse { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

pub type TestLocations = HashMap<String, SourceLocation>;

/// group -> test function name -> where it is declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupLocationIndex {
    groups: HashMap<String, TestLocations>,
}

impl GroupLocationIndex {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, group: impl Into<String>, tests: TestLocations) {
        self.groups.insert(group.into(), tests);
    }

    /// A missing group or test is a soft miss.
    pub fn lookup(&self, group: &str, test: &str) -> Option<&SourceLocation> {
        self.groups.get(group)?.get(test)
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn len(&self) -> usize { self.groups.len() }

    pub fn is_empty(&self) -> bool { self.groups.is_empty() }
}

pub struct LocationResolver<'a> {
    query: &'a dyn MetadataQuery,
    parser: &'a dyn SourceParser,
    ad_hoc_target: Option<String>,
}

impl<'a> LocationResolver<'a> {
    pub fn new(query: &'a dyn MetadataQuery, parser: &'a dyn SourceParser) -> Self {
        Self { query, parser, ad_hoc_target: None }
    }

    /// Target queried in place of the ad-hoc pseudo-group. Without one the
    /// pseudo-group stays unresolved.
    pub fn with_ad_hoc_target(mut self, target: Option<String>) -> Self {
        self.ad_hoc_target = target;
        self
    }

    /// Resolve every group in parallel. The first failure fails the whole
    /// call; every spawned task has been joined by the time this returns.
    pub fn resolve(&self, groups: &BTreeSet<String>) -> Result<GroupLocationIndex, ResolveError> {
        let jobs: Vec<(&str, &str)> = groups
            .iter()
            .filter_map(|group| self.target_for(group).map(|target| (group.as_str(), target)))
            .collect();

        let resolved: Vec<(&str, TestLocations)> = jobs
            .par_iter()
            .map(|&(group, target)| self.resolve_one(group, target).map(|tests| (group, tests)))
            .collect::<Result<_, ResolveError>>()?;

        let mut index = GroupLocationIndex::new();
        for (group, tests) in resolved {
            index.insert(group, tests);
        }
        Ok(index)
    }

    /// Build the index from pre-computed listings without querying anything.
    pub fn resolve_listings(&self, listings: &[PackageListing]) -> Result<GroupLocationIndex, ResolveError> {
        let resolved: Vec<(&str, TestLocations)> = listings
            .par_iter()
            .map(|listing| self.locate(listing).map(|tests| (listing.import_path.as_str(), tests)))
            .collect::<Result<_, ResolveError>>()?;

        let mut index = GroupLocationIndex::new();
        for (group, tests) in resolved {
            index.insert(group, tests);
        }
        Ok(index)
    }

    fn target_for<'g>(&'g self, group: &'g str) -> Option<&'g str> {
        if group == AD_HOC_GROUP {
            return self.ad_hoc_target.as_deref();
        }
        Some(group)
    }

    fn resolve_one(&self, group: &str, target: &str) -> Result<TestLocations, ResolveError> {
        tracing::debug!(group, target, "resolving test locations");
        let listing = self.query.describe(target)?;
        self.locate(&listing)
    }

    fn locate(&self, listing: &PackageListing) -> Result<TestLocations, ResolveError> {
        let mut tests = TestLocations::new();
        for path in listing.test_file_paths() {
            let file = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            for func in self.parser.functions(&path)? {
                tests.insert(
                    func.name,
                    SourceLocation { file: file.clone(), line: func.line, column: func.column },
                );
            }
        }
        Ok(tests)
    }
}
