use crate::resolver::ResolveError;
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// The subset of `go list -json` output needed to locate test functions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageListing {
    #[serde(rename = "Dir", default)]
    pub dir: PathBuf,
    #[serde(rename = "ImportPath", default)]
    pub import_path: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "TestGoFiles", default)]
    pub test_files: Vec<String>,
    #[serde(rename = "XTestGoFiles", default)]
    pub xtest_files: Vec<String>,
}

impl PackageListing {
    /// In-package test files first, then external `_test` package files.
    pub fn test_file_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.test_files
            .iter()
            .chain(self.xtest_files.iter())
            .map(|f| self.dir.join(f))
    }
}

pub trait MetadataQuery: Sync {
    fn describe(&self, target: &str) -> Result<PackageListing, ResolveError>;
}

/// Queries the Go toolchain, one short-lived `go list` process per target.
#[derive(Debug, Clone)]
pub struct GoList {
    program: String,
    timeout: Duration,
}

impl Default for GoList {
    fn default() -> Self {
        Self { program: "go".into(), timeout: DEFAULT_QUERY_TIMEOUT }
    }
}

impl GoList {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, ..Self::default() }
    }

    fn run(&self, target: &str) -> Result<Vec<u8>, ResolveError> {
        let mut child = Command::new(&self.program)
            .args(["list", "-json", target])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ResolveError::Spawn { program: self.program.clone(), source })?;

        // Both pipes are drained while the wait loop polls; a full pipe stalls the child.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout.map(join_drain);
                    let _ = stderr.map(join_drain);
                    return Err(ResolveError::Timeout { group: target.to_string(), timeout: self.timeout });
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(10)),
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout.map(join_drain);
                    let _ = stderr.map(join_drain);
                    return Err(ResolveError::Spawn { program: self.program.clone(), source });
                }
            }
        };

        let out = stdout.map(join_drain).unwrap_or_default();
        let err = stderr.map(join_drain).unwrap_or_default();
        if !status.success() {
            return Err(ResolveError::Query {
                group: target.to_string(),
                reason: format!("{status}: {}", String::from_utf8_lossy(&err).trim()),
            });
        }
        Ok(out)
    }
}

impl MetadataQuery for GoList {
    fn describe(&self, target: &str) -> Result<PackageListing, ResolveError> {
        let out = self.run(target)?;
        serde_json::from_slice(&out).map_err(|source| ResolveError::Metadata {
            group: target.to_string(),
            source,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_drain(handle: std::thread::JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

/// Decode a concatenated stream of `go list -json` objects, as written by
/// `go list -json ./...`.
pub fn read_listings<R: Read>(reader: R) -> Result<Vec<PackageListing>, serde_json::Error> {
    serde_json::Deserializer::from_reader(reader)
        .into_iter::<PackageListing>()
        .collect()
}

/// Serves pre-computed listings, keyed by import path.
#[derive(Debug, Default, Clone)]
pub struct StaticListings {
    listings: Vec<PackageListing>,
}

impl StaticListings {
    pub fn new(listings: Vec<PackageListing>) -> Self {
        Self { listings }
    }

    pub fn listings(&self) -> &[PackageListing] {
        &self.listings
    }
}

impl MetadataQuery for StaticListings {
    fn describe(&self, target: &str) -> Result<PackageListing, ResolveError> {
        self.listings
            .iter()
            .find(|l| l.import_path == target)
            .cloned()
            .ok_or_else(|| ResolveError::Query {
                group: target.to_string(),
                reason: "no such package in listing".into(),
            })
    }
}
