use crate::config::IndicatorSize;
use crate::report::ReportModel;
use chrono::{DateTime, Local};
use std::io::{self, Write};
use thiserror::Error;

const HTML_TEMPLATE: &str = include_str!("../assets/report.html");
const SCRIPT: &str = include_str!("../assets/report.js");

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode report data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Page-level settings that are not part of the report model.
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub title: String,
    pub indicator: IndicatorSize,
    pub execution_date: String,
}

impl PageSettings {
    pub fn new(title: impl Into<String>, indicator: IndicatorSize) -> Self {
        Self { title: title.into(), indicator, execution_date: format_execution_date(Local::now()) }
    }
}

/// e.g. `July 10, 2020 01:24:44`
pub fn format_execution_date(at: DateTime<Local>) -> String {
    at.format("%B %-d, %Y %H:%M:%S").to_string()
}

pub trait Renderer {
    fn render(&self, model: &ReportModel, page: &PageSettings, out: &mut dyn Write) -> Result<(), RenderError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, model: &ReportModel, page: &PageSettings, out: &mut dyn Write) -> Result<(), RenderError> {
        // `</` would terminate the surrounding <script> element early.
        let data = serde_json::to_string(&model.groups)?.replace("</", "<\\/");
        let groups = indicator_divs(model);
        let title = html_escape::encode_text(&page.title);
        let html = fill(HTML_TEMPLATE, |key| {
            Some(match key {
                "title" => title.to_string(),
                "indicator_width" => page.indicator.width_px(),
                "indicator_height" => page.indicator.height_px(),
                "total" => model.summary.total.to_string(),
                "passed" => model.summary.passed.to_string(),
                "failed" => model.summary.failed.to_string(),
                "skipped" => model.summary.skipped.to_string(),
                "duration" => format!("{:?}", model.duration()),
                "execution_date" => html_escape::encode_text(&page.execution_date).to_string(),
                "groups" => groups.clone(),
                "script" => SCRIPT.to_string(),
                "data" => data.clone(),
                _ => return None,
            })
        });
        out.write_all(html.as_bytes())?;
        Ok(())
    }
}

fn indicator_divs(model: &ReportModel) -> String {
    let mut s = String::new();
    for (i, group) in model.groups.iter().enumerate() {
        let class = if group.failed {
            " failed"
        } else if group.skipped {
            " skipped"
        } else {
            ""
        };
        s.push_str(&format!("  <div class=\"testResultGroup{class}\" data-group=\"{i}\"></div>\n"));
    }
    s
}

/// Single pass over `{{key}}` placeholders; substituted text is never rescanned.
fn fill<F>(template: &str, mut value: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match value(key) {
                    Some(v) => out.push_str(&v),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
