use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use go_test_report::config::{self, IndicatorSize, ReportConfig};
use go_test_report::metadata::GoList;
use go_test_report::pipeline::Pipeline;
use go_test_report::render::HtmlRenderer;
use go_test_report::source::GoSourceParser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Once;
use std::time::{Duration, Instant};

fn init_parallelism() {
    static START: Once = Once::new();
    START.call_once(|| {
        let n = num_cpus::get();
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    });
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GroupBy {
    /// Fixed windows of --groupSize tests
    Window,
    /// One indicator per package
    Package,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints the version number of go-test-report
    Version,
}

#[derive(Parser, Debug)]
#[command(
    name = "go-test-report",
    version,
    about = "Captures go test output via stdin and parses it into a single self-contained html file."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// The title text shown in the test report
    #[arg(long = "title", short = 't', default_value = config::DEFAULT_TITLE)]
    title: String,
    /// The size (in pixels) of the clickable indicator for test result groups, `N` or `WxH`
    #[arg(long = "size", short = 's', default_value = "24")]
    size: String,
    /// The number of tests per test group indicator
    #[arg(long = "groupSize", short = 'g', default_value_t = go_test_report::report::DEFAULT_GROUP_SIZE)]
    group_size: usize,
    /// How tests are bucketed into indicators
    #[arg(long = "group-by", value_enum, default_value_t = GroupBy::Window)]
    group_by: GroupBy,
    /// A `go list -json` output file used instead of querying each package
    #[arg(long = "list", short = 'l')]
    list: Option<PathBuf>,
    /// The HTML output file
    #[arg(long = "output", short = 'o', default_value = config::DEFAULT_OUTPUT)]
    output: PathBuf,
    /// While processing, show the complete output from go test
    #[arg(long = "verbose", short = 'v', default_value_t = false)]
    verbose: bool,
    /// Merge the results into the report previously written to --output
    #[arg(long = "append", short = 'a', default_value_t = false)]
    append: bool,
    /// Package or directory to query for tests run against files directly
    #[arg(long = "target")]
    target: Option<String>,
    /// Seconds to wait for each `go list` invocation
    #[arg(long = "timeout", default_value_t = 60)]
    timeout_secs: u64,
}

impl Cli {
    fn into_config(self) -> Result<ReportConfig, config::ConfigError> {
        let indicator: IndicatorSize = self.size.parse()?;
        let grouping = config::grouping_policy(self.group_size, self.group_by == GroupBy::Package)?;
        Ok(ReportConfig {
            title: self.title,
            indicator,
            grouping,
            output: self.output,
            verbose: self.verbose,
            append: self.append,
            list_file: self.list,
            ad_hoc_target: self.target,
            query_timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    init_parallelism();
    let cli = Cli::parse();

    let mut stdout = io::stdout();
    if let Some(Command::Version) = cli.command {
        writeln!(stdout, "go-test-report v{}", env!("CARGO_PKG_VERSION"))?;
        return Ok(());
    }

    let started = Instant::now();
    let config = cli.into_config()?;
    if atty::is(atty::Stream::Stdin) {
        anyhow::bail!("missing stdin pipe; run `go test -json ./... | go-test-report`");
    }

    let query = GoList::new(config.query_timeout);
    let parser = GoSourceParser;
    let pipeline = Pipeline::new(&config, &query, &parser);

    let stdin = io::stdin();
    let echo: Option<&mut dyn Write> = if config.verbose { Some(&mut stdout) } else { None };
    let batch = pipeline
        .collect(stdin.lock(), echo)
        .context("failed to collect test results")?;
    if batch.skipped_lines > 0 {
        tracing::warn!(skipped = batch.skipped_lines, read = batch.lines_read, "some input lines could not be decoded");
    }

    let model = pipeline.merge(batch.model)?;
    pipeline
        .write(&model, &HtmlRenderer)
        .with_context(|| format!("failed to write {}", config.output.display()))?;

    writeln!(stdout, "[go-test-report] finished in {:?}", started.elapsed())?;
    Ok(())
}
