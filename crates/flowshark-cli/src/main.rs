use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use flowshark_core::experiment::{
    ConfigError, ExperimentConfig, ExperimentError, ExperimentReport, RandomForest, run_experiments,
};
use flowshark_core::pipeline::{PipelineError, extract_features, prepare_dataset};
use flowshark_core::table::LabelCatalog;
use flowshark_core::table::csv::{read_table, write_dataset, write_traffic};
use flowshark_core::validate::{DATASET_SCHEMA, ValidationError};
use flowshark_core::{CaptureInput, IatOrder, build_traffic_report, decode_captures};
use glob::glob;
use log::{info, warn};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("FLOWSHARK_BUILD_COMMIT"),
    " ",
    env!("FLOWSHARK_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "flowshark")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Turn per-application packet captures into flow features and score feature-set hypotheses.",
    long_about = None,
    after_help = "Examples:\n  flowshark extract --app Chrome=chrome.pcap --app Zoom=zoom.pcapng -o traffic.csv --dataset dataset.csv\n  flowshark extract --dir captures/ -o traffic.csv --summary report.json\n  flowshark classify dataset.csv --seed 7 --trees 10"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode captures into a traffic table, optionally a labelled dataset and a summary.
    Extract {
        /// Capture of one application, as NAME=PATH (repeatable)
        #[arg(long = "app", value_name = "NAME=PATH")]
        apps: Vec<String>,

        /// Directory of .pcap/.pcapng files; each file stem names its application
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Traffic table output (CSV)
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Also write the feature dataset (CSV) with numeric labels
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Also write a per-application traffic report (JSON)
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Stop each capture after this many decoded packets
        #[arg(long)]
        limit: Option<usize>,

        /// Captures decoded concurrently
        #[arg(long, default_value_t = 1)]
        jobs: usize,

        /// Inter-arrival ordering inside a flow
        #[arg(long, value_name = "timestamp|arrival", default_value_t = IatOrder::Timestamp)]
        iat_order: IatOrder,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
    /// Train and score one classifier per feature-set hypothesis.
    Classify {
        /// Combined feature dataset (CSV)
        dataset: PathBuf,

        /// Experiment config (JSON); flags below override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed of the split and the forest
        #[arg(long)]
        seed: Option<u64>,

        /// Fraction of rows held out for evaluation
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Trees per forest
        #[arg(long)]
        trees: Option<usize>,

        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Inter-arrival ordering inside a flow
        #[arg(long, value_name = "timestamp|arrival")]
        iat_order: Option<IatOrder>,

        /// Evaluate hypotheses concurrently
        #[arg(long)]
        parallel: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Extract {
            apps,
            dir,
            output,
            dataset,
            summary,
            limit,
            jobs,
            iat_order,
            quiet,
        } => cmd_extract(ExtractArgs {
            apps,
            dir,
            output,
            dataset,
            summary,
            limit,
            jobs,
            iat_order,
            quiet,
        }),
        Commands::Classify {
            dataset,
            config,
            seed,
            test_fraction,
            trees,
            max_depth,
            iat_order,
            parallel,
            json,
        } => cmd_classify(ClassifyArgs {
            dataset,
            config,
            overrides: Overrides {
                seed,
                test_fraction,
                trees,
                max_depth,
                iat_order,
                parallel,
            },
            json,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }

    fn hinted(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::new(message, Some(hint.into()))
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::hinted(err.to_string(), "check the experiment config or the override flags")
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        let PipelineError::Validation(err) = err;
        let hint = match &err {
            ValidationError::SchemaError { .. } => {
                let required: Vec<&str> = DATASET_SCHEMA.iter().map(|column| column.name).collect();
                format!("the dataset needs the columns: {}", required.join(", "))
            }
            ValidationError::LabelTypeError { .. } => {
                "Classification must hold numeric labels; `flowshark extract --dataset` encodes app names"
                    .to_string()
            }
            ValidationError::ColumnTypeError { .. } => {
                "fix or remove the offending row".to_string()
            }
            ValidationError::Table(_) => "check that the file is a well-formed CSV table".to_string(),
        };
        CliError::hinted(err.to_string(), hint)
    }
}

impl From<ExperimentError> for CliError {
    fn from(err: ExperimentError) -> Self {
        let hint = match err {
            ExperimentError::EmptyDataset => "no usable rows remain after validation",
            ExperimentError::InsufficientClasses { .. } => {
                "the dataset needs captures from at least two applications"
            }
        };
        CliError::hinted(err.to_string(), hint)
    }
}

struct ExtractArgs {
    apps: Vec<String>,
    dir: Option<PathBuf>,
    output: PathBuf,
    dataset: Option<PathBuf>,
    summary: Option<PathBuf>,
    limit: Option<usize>,
    jobs: usize,
    iat_order: IatOrder,
    quiet: bool,
}

fn cmd_extract(args: ExtractArgs) -> Result<(), CliError> {
    let mut inputs = args
        .apps
        .iter()
        .map(|spec| parse_app_spec(spec))
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(dir) = &args.dir {
        inputs.extend(discover_captures(dir)?);
    }
    if inputs.is_empty() {
        return Err(CliError::hinted(
            "no captures given",
            "use --app NAME=PATH or --dir DIR",
        ));
    }

    let mut captures = Vec::new();
    for result in decode_captures(&inputs, args.limit, args.jobs) {
        match result {
            Ok(capture) => captures.push(capture),
            Err(err) => warn!("skipping {err}"),
        }
    }
    if captures.is_empty() {
        return Err(CliError::hinted(
            "none of the captures could be decoded",
            "expected readable .pcap or .pcapng files",
        ));
    }

    let records: Vec<_> = captures
        .iter()
        .flat_map(|capture| capture.records.iter().cloned())
        .collect();
    let skipped: u64 = captures
        .iter()
        .map(|capture| capture.summary.skipped_total())
        .sum();
    info!(
        "decoded {} packet(s) from {} capture(s), {} skipped",
        records.len(),
        captures.len(),
        skipped
    );

    let output = create_output(&args.output)?;
    write_traffic(&records, output)
        .with_context(|| format!("Failed to write traffic table: {}", args.output.display()))?;

    if args.dataset.is_some() || args.summary.is_some() {
        let rows = extract_features(records.clone(), args.iat_order);

        if let Some(path) = &args.dataset {
            let mut labels = LabelCatalog::default();
            write_dataset(&rows, &mut labels, create_output(path)?)
                .with_context(|| format!("Failed to write dataset: {}", path.display()))?;
            if !args.quiet {
                for (id, name) in labels.names().iter().enumerate() {
                    eprintln!("label {id} = {name}");
                }
            }
        }

        if let Some(path) = &args.summary {
            let report = build_traffic_report(&captures, &rows);
            let json = serde_json::to_string_pretty(&report).context("JSON serialization failed")?;
            fs::write(path, json)
                .with_context(|| format!("Failed to write summary: {}", path.display()))?;
        }
    }

    if !args.quiet {
        eprintln!(
            "OK: {} packet(s) from {} capture(s) -> {}",
            records.len(),
            captures.len(),
            args.output.display()
        );
    }
    Ok(())
}

fn parse_app_spec(spec: &str) -> Result<CaptureInput, CliError> {
    match spec.split_once('=') {
        Some((app, path)) if !app.trim().is_empty() && !path.is_empty() => {
            Ok(CaptureInput::new(app.trim(), path))
        }
        _ => Err(CliError::hinted(
            format!("invalid --app value '{spec}'"),
            "expected NAME=PATH, e.g. --app Chrome=chrome.pcap",
        )),
    }
}

fn discover_captures(dir: &Path) -> Result<Vec<CaptureInput>, CliError> {
    if !dir.is_dir() {
        return Err(CliError::hinted(
            format!("not a directory: {}", dir.display()),
            "--dir expects a directory of .pcap/.pcapng files",
        ));
    }
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut paths = Vec::new();
    for ext in ["pcap", "pcapng"] {
        let pattern = format!("{base}/*.{ext}");
        let entries = glob(&pattern).map_err(|err| {
            CliError::hinted(
                format!("invalid capture pattern '{pattern}'"),
                format!("pattern error: {}", err.msg),
            )
        })?;
        for entry in entries {
            let path = entry.context("Failed to list capture directory")?;
            if path.is_file() {
                paths.push(path);
            }
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .filter_map(|path| {
            let app = path.file_stem()?.to_string_lossy().into_owned();
            Some(CaptureInput::new(app, path))
        })
        .collect())
}

fn create_output(path: &Path) -> Result<BufWriter<File>, CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

struct Overrides {
    seed: Option<u64>,
    test_fraction: Option<f64>,
    trees: Option<usize>,
    max_depth: Option<usize>,
    iat_order: Option<IatOrder>,
    parallel: bool,
}

impl Overrides {
    fn apply(&self, config: &mut ExperimentConfig) {
        if let Some(seed) = self.seed {
            config.seed = seed;
            config.forest.seed = seed;
        }
        if let Some(fraction) = self.test_fraction {
            config.test_fraction = fraction;
        }
        if let Some(trees) = self.trees {
            config.forest.n_trees = trees;
        }
        if let Some(depth) = self.max_depth {
            config.forest.max_depth = Some(depth);
        }
        if let Some(order) = self.iat_order {
            config.iat_order = order;
        }
        if self.parallel {
            config.parallel = true;
        }
    }
}

struct ClassifyArgs {
    dataset: PathBuf,
    config: Option<PathBuf>,
    overrides: Overrides,
    json: bool,
}

fn cmd_classify(args: ClassifyArgs) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            ExperimentConfig::from_json(&text)?
        }
        None => ExperimentConfig::default(),
    };
    args.overrides.apply(&mut config);
    config.validate()?;

    if !args.dataset.is_file() {
        return Err(CliError::hinted(
            format!("dataset not found: {}", args.dataset.display()),
            "pass the CSV written by `flowshark extract --dataset`",
        ));
    }
    let file = File::open(&args.dataset)
        .with_context(|| format!("Failed to open dataset: {}", args.dataset.display()))?;
    let table = read_table(file)
        .with_context(|| format!("Failed to read dataset: {}", args.dataset.display()))?;

    let prepared = prepare_dataset(&table, config.iat_order)?;
    let remediation = prepared.remediation;
    if remediation.rows_dropped > 0 {
        warn!("dropped {} incomplete row(s)", remediation.rows_dropped);
    }

    let prototype = RandomForest::new(config.forest.clone());
    let report = run_experiments(&prepared.rows, &config, &prototype)?;
    print_report(&report, args.json)
}

fn print_report(report: &ExperimentReport, json: bool) -> Result<(), CliError> {
    if json {
        let text = serde_json::to_string_pretty(report).context("JSON serialization failed")?;
        println!("{text}");
    } else {
        print!("{}", report.render());
    }
    Ok(())
}
