use crate::metadata::DEFAULT_QUERY_TIMEOUT;
use crate::report::GroupingPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TITLE: &str = "go-test-report";
pub const DEFAULT_OUTPUT: &str = "test_report.html";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("malformed size value; only one x is allowed if specifying width and height")]
    MalformedSize,
    #[error("invalid size component {component:?}: {source}")]
    InvalidSize {
        component: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("group size must be at least 1")]
    GroupSize,
}

/// Pixel size of the clickable group indicator, given as `N` or `WxH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorSize {
    pub width: u32,
    pub height: u32,
}

impl Default for IndicatorSize {
    fn default() -> Self { Self { width: 24, height: 24 } }
}

impl IndicatorSize {
    pub fn width_px(&self) -> String { format!("{}px", self.width) }

    pub fn height_px(&self) -> String { format!("{}px", self.height) }
}

fn parse_component(component: &str) -> Result<u32, ConfigError> {
    component.trim().parse().map_err(|source| ConfigError::InvalidSize {
        component: component.to_string(),
        source,
    })
}

impl FromStr for IndicatorSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        let parts: Vec<&str> = s.split('x').collect();
        match parts.as_slice() {
            [side] => {
                let v = parse_component(side)?;
                Ok(Self { width: v, height: v })
            }
            [w, h] => Ok(Self { width: parse_component(w)?, height: parse_component(h)? }),
            _ => Err(ConfigError::MalformedSize),
        }
    }
}

pub fn grouping_policy(group_size: usize, by_group: bool) -> Result<GroupingPolicy, ConfigError> {
    if by_group {
        return Ok(GroupingPolicy::ByGroup);
    }
    if group_size == 0 {
        return Err(ConfigError::GroupSize);
    }
    Ok(GroupingPolicy::Window(group_size))
}

/// Validated settings for one report run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub title: String,
    pub indicator: IndicatorSize,
    pub grouping: GroupingPolicy,
    pub output: PathBuf,
    pub verbose: bool,
    pub append: bool,
    pub list_file: Option<PathBuf>,
    pub ad_hoc_target: Option<String>,
    pub query_timeout: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.into(),
            indicator: IndicatorSize::default(),
            grouping: GroupingPolicy::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            verbose: false,
            append: false,
            list_file: None,
            ad_hoc_target: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}
