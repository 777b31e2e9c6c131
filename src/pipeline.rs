use crate::aggregator::{aggregate_reader, Aggregation};
use crate::config::ReportConfig;
use crate::errors::ReportError;
use crate::metadata::{read_listings, MetadataQuery};
use crate::render::{PageSettings, Renderer};
use crate::report::{assemble, ReportModel};
use crate::resolver::{GroupLocationIndex, LocationResolver};
use crate::source::SourceParser;
use crate::store;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::time::Instant;

pub struct Pipeline<'a> {
    config: &'a ReportConfig,
    query: &'a dyn MetadataQuery,
    parser: &'a dyn SourceParser,
}

/// A freshly assembled batch and what was dropped while reading it.
#[derive(Debug)]
pub struct Batch {
    pub model: ReportModel,
    pub lines_read: usize,
    pub skipped_lines: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a ReportConfig, query: &'a dyn MetadataQuery, parser: &'a dyn SourceParser) -> Self {
        Self { config, query, parser }
    }

    /// Aggregate `input` and resolve locations; the batch duration covers
    /// both phases.
    pub fn collect<R: BufRead>(&self, input: R, echo: Option<&mut dyn Write>) -> Result<Batch, ReportError> {
        let started = Instant::now();
        let Aggregation { entries, groups, lines_read, skipped_lines } = aggregate_reader(input, echo)?;
        tracing::info!(lines_read, skipped_lines, tests = entries.len(), groups = groups.len(), "input aggregated");

        let resolver = LocationResolver::new(self.query, self.parser)
            .with_ad_hoc_target(self.config.ad_hoc_target.clone());
        let index = match &self.config.list_file {
            Some(path) => {
                let file = File::open(path)?;
                let listings = read_listings(BufReader::new(file))
                    .map_err(|source| ReportError::Listing { path: path.clone(), source })?;
                resolver.resolve_listings(&listings)?
            }
            None if groups.is_empty() => GroupLocationIndex::new(),
            None => resolver.resolve(&groups)?,
        };
        let elapsed = started.elapsed();
        tracing::info!(resolved_groups = index.len(), ?elapsed, "test locations resolved");

        let model = assemble(entries.into_values(), &index, self.config.grouping, elapsed);
        Ok(Batch { model, lines_read, skipped_lines })
    }

    /// In append mode the batch is merged into the model stored next to the
    /// output; otherwise the batch is the whole report.
    pub fn merge(&self, batch: ReportModel) -> Result<ReportModel, ReportError> {
        if !self.config.append {
            return Ok(batch);
        }
        let mut model = store::load(&store::side_file_for(&self.config.output))?;
        model.append(batch);
        Ok(model)
    }

    /// Render and encode fully in memory, then stage both files and rename
    /// them into place. The side-file goes first: if it cannot be placed the
    /// previous report is left as it was.
    pub fn write(&self, model: &ReportModel, renderer: &dyn Renderer) -> Result<(), ReportError> {
        let page = PageSettings::new(self.config.title.clone(), self.config.indicator);
        let mut html = Vec::new();
        renderer.render(model, &page, &mut html)?;
        let side_file = store::side_file_for(&self.config.output);
        let data = store::encode(&side_file, model)?;

        let side = store::Staged::write(&side_file, &data)?;
        let report = store::Staged::write(&self.config.output, &html)?;
        side.commit()?;
        report.commit()?;
        Ok(())
    }
}
