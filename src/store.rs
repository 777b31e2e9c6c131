use crate::report::ReportModel;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid report data for {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode report data for {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `test_report.html` keeps its model in `test_report.html.json`.
pub fn side_file_for(report_path: &Path) -> PathBuf {
    let mut name = report_path.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

/// A missing side-file is an empty model.
pub fn load(path: &Path) -> Result<ReportModel, StoreError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ReportModel::default()),
        Err(source) => return Err(StoreError::Io { path: path.to_path_buf(), source }),
    };
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode { path: path.to_path_buf(), source })
}

pub fn encode(path: &Path, model: &ReportModel) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(model).map_err(|source| StoreError::Encode { path: path.to_path_buf(), source })
}

/// Bytes written next to their destination and renamed into place on
/// `commit`. Dropping an uncommitted file removes it, leaving the
/// destination untouched.
#[derive(Debug)]
pub struct Staged {
    tmp: PathBuf,
    dest: PathBuf,
}

impl Staged {
    pub fn write(dest: &Path, bytes: &[u8]) -> Result<Self, StoreError> {
        let mut name = dest.as_os_str().to_os_string();
        name.push(".tmp");
        let tmp = PathBuf::from(name);
        fs::write(&tmp, bytes).map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        Ok(Self { tmp, dest: dest.to_path_buf() })
    }

    pub fn commit(self) -> Result<(), StoreError> {
        fs::rename(&self.tmp, &self.dest).map_err(|source| StoreError::Io { path: self.dest.clone(), source })
    }
}

impl Drop for Staged {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.tmp);
    }
}
