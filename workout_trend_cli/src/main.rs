use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use workout_trend::{
    collect_tags, run, AverageBasis, ChartSeries, Metric, Params, PipelineOutcome, TagSource,
    TypeFilter, DEFAULT_MIN_DURATION_SECONDS, DEFAULT_WORKOUT_TYPE,
};

mod chart;

use chart::{render_chart_guard, ChartKind, ChartOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Workout trend charts from TCX exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plot one metric per workout against the workout date
    Chart(ChartArgs),
    /// List the workout type tags found in the data directory
    Tags(TagsArgs),
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Directory holding the TCX exports
    #[arg(long, default_value = "./data/", value_hint = ValueHint::DirPath)]
    data_dir: PathBuf,

    /// Where the workout type tag is read from
    #[arg(long, value_enum, default_value_t = TagSourceOpt::Notes)]
    tag_source: TagSourceOpt,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct ChartArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Workout type to analyze (`*` for all workouts)
    #[arg(short = 't', long, default_value = DEFAULT_WORKOUT_TYPE)]
    workout_type: String,

    /// Skip workouts lasting this many seconds or less
    #[arg(long, default_value_t = DEFAULT_MIN_DURATION_SECONDS)]
    min_duration: f64,

    /// Skip workouts whose metric is at or below this value
    #[arg(long)]
    min_metric: Option<f64>,

    /// Metric plotted on the Y axis
    #[arg(long, value_enum, default_value_t = MetricOpt::Distance)]
    metric: MetricOpt,

    /// Denominator of the reported average
    #[arg(long, value_enum, default_value_t = AverageBasisOpt::Filtered)]
    average_basis: AverageBasisOpt,

    /// Output chart path (`.png` or `.svg`)
    #[arg(short, long, default_value = "workouts.png", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Optional CSV of the plotted series (`-` for stdout)
    #[arg(long, value_hint = ValueHint::FilePath)]
    csv: Option<PathBuf>,

    /// Disable chart generation
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Profile major stages with timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Args, Debug)]
struct TagsArgs {
    #[command(flatten)]
    data: DataArgs,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MetricOpt {
    Distance,
    HeartRate,
}

impl From<MetricOpt> for Metric {
    fn from(value: MetricOpt) -> Self {
        match value {
            MetricOpt::Distance => Metric::DistanceMiles,
            MetricOpt::HeartRate => Metric::AverageHeartRate,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TagSourceOpt {
    Notes,
    Sport,
}

impl From<TagSourceOpt> for TagSource {
    fn from(value: TagSourceOpt) -> Self {
        match value {
            TagSourceOpt::Notes => TagSource::Notes,
            TagSourceOpt::Sport => TagSource::Sport,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AverageBasisOpt {
    Filtered,
    Plotted,
}

impl From<AverageBasisOpt> for AverageBasis {
    fn from(value: AverageBasisOpt) -> Self {
        match value {
            AverageBasisOpt::Filtered => AverageBasis::Filtered,
            AverageBasisOpt::Plotted => AverageBasis::Plotted,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Chart(args) => args.data.verbose,
        Command::Tags(args) => args.data.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Chart(args) => handle_chart(args),
        Command::Tags(args) => handle_tags(args),
    }
}

fn base_params(data: &DataArgs) -> Params {
    Params {
        data_dir: data.data_dir.clone(),
        tag_source: data.tag_source.into(),
        ..Params::default()
    }
}

fn handle_chart(args: ChartArgs) -> Result<()> {
    let mut params = base_params(&args.data);
    params.workout_type = TypeFilter::parse(&args.workout_type);
    params.min_duration_seconds = args.min_duration;
    params.min_metric = args.min_metric;
    params.metric = args.metric.into();
    params.average_basis = args.average_basis.into();

    let t_run = Instant::now();
    let outcome = run(&params)?;
    if args.profile || args.data.verbose {
        info!(
            "Analysis stage: {:.1} ms",
            t_run.elapsed().as_secs_f64() * 1000.0
        );
    }

    let report = match outcome {
        PipelineOutcome::Aggregated(report) => report,
        PipelineOutcome::NoFiles | PipelineOutcome::NoWorkouts(_) => return Ok(()),
    };

    if report.files_skipped > 0 || report.malformed_records > 0 {
        warn!(
            "Skipped {} unreadable files and {} malformed workouts",
            report.files_skipped, report.malformed_records
        );
    }

    let series = &report.aggregation.series;
    if let Some(csv_path) = args.csv.as_ref() {
        if csv_path.as_os_str() == "-" {
            write_series_stdout(series, params.metric)?;
        } else {
            write_series_csv(series, params.metric, csv_path)?;
            info!("Wrote series CSV: {}", csv_path.display());
        }
    }

    if args.no_plot {
        return Ok(());
    }
    if series.is_empty() {
        warn!("No workouts left to plot after the duration and metric gates");
        return Ok(());
    }

    let opts = ChartOptions {
        caption: match &params.workout_type {
            TypeFilter::Any => "All workouts".to_string(),
            TypeFilter::Exact(tag) => format!("{} workouts", tag),
        },
        y_label: params.metric.label().to_string(),
    };
    let kind = ChartKind::from_path(&args.output);
    let t_plot = Instant::now();
    render_chart_guard(series, &args.output, kind, &opts)
        .map_err(|err| anyhow!("failed to render {}: {}", args.output.display(), err))?;
    if args.profile || args.data.verbose {
        info!(
            "Plot stage: {:.1} ms",
            t_plot.elapsed().as_secs_f64() * 1000.0
        );
    }
    info!("Wrote plot: {}", args.output.display());
    Ok(())
}

fn handle_tags(args: TagsArgs) -> Result<()> {
    let params = base_params(&args.data);
    let tags = collect_tags(&params)?;
    if tags.is_empty() {
        warn!("No workouts found in {}", params.data_dir.display());
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for (tag, count) in &tags {
        let shown = if tag.is_empty() { "(none)" } else { tag.as_str() };
        writeln!(handle, "{}\t{}", shown, count)?;
    }
    Ok(())
}

fn write_series_stdout(series: &ChartSeries, metric: Metric) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::Writer::from_writer(handle);
    write_series_rows(series, metric, &mut writer)
}

fn write_series_csv(series: &ChartSeries, metric: Metric, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_series_rows(series, metric, &mut writer)
}

fn write_series_rows<W: Write>(
    series: &ChartSeries,
    metric: Metric,
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    writer.write_record(["date", metric.column()])?;
    for (date, value) in series.points() {
        writer.write_record([date.to_string(), format!("{:.3}", value)])?;
    }
    writer.flush()?;
    Ok(())
}
