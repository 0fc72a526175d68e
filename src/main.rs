//! recon-plot command line entry point
//!
//! Converts legacy text exports to `.plot` containers and prints dataset
//! summaries.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use anyhow::Context;
use clap::{Parser, Subcommand};
use recon_plot::{
    config::{default_config_path, LoggingConfig},
    parse::fix_file_suffix,
    AppConfig, ContainerCodec, DatasetEvent, SignalDataset, TextImporter,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "recon-plot", version, about = "Convert and inspect analog recordings")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a text export into a .plot container
    Import {
        /// Text export to read
        input: PathBuf,

        /// Output container (defaults to the input name with the container extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a summary of .plot containers or text exports
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "recon-plot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => Ok(AppConfig::load(path)?),
        None => Ok(AppConfig::load_or_default()),
    }
}

fn import_text(config: &AppConfig, input: &Path) -> anyhow::Result<SignalDataset> {
    let mut importer = TextImporter::from_config(&config.import);
    let events = importer.subscribe();

    // Report progress from a separate thread; it ends when the importer is dropped
    let reporter = thread::spawn(move || {
        for event in events {
            if let DatasetEvent::ProgressUpdated { value, range } = event {
                if range > 0 {
                    tracing::debug!("Import progress: {}%", value * 100 / range);
                }
            }
        }
    });

    let result = importer.import_file(input);
    drop(importer);
    join_reporter(reporter);

    Ok(result?)
}

/// Wait for the progress reporter; returns false if it panicked
fn join_reporter(reporter: JoinHandle<()>) -> bool {
    match reporter.join() {
        Ok(()) => true,
        Err(_) => {
            tracing::warn!("Progress reporter thread panicked");
            false
        }
    }
}

fn open_any(config: &AppConfig, path: &Path) -> anyhow::Result<SignalDataset> {
    let codec = ContainerCodec::from_config(&config.container);
    if codec.is_container_path(path) {
        Ok(SignalDataset::open_with(&codec, path)?)
    } else {
        import_text(config, path)
    }
}

fn print_summary(dataset: &SignalDataset) {
    let summary = dataset.summary();
    if let Some(path) = &summary.path {
        println!("{}", path.display());
    }
    println!("  Title:    {}", summary.title);
    println!("  Device:   {}", summary.device);
    println!("  Original: {}", summary.original_file_name);
    println!("  Axes:     {} / {}", summary.label_x, summary.label_y);
    println!("  Samples:  {}", summary.samples);
    println!(
        "  Window:   x [{}, {}] y [{}, {}]",
        summary.window.left, summary.window.right, summary.window.bottom, summary.window.top
    );
    for (i, channel) in dataset.channels().iter().enumerate() {
        let marker = if channel.is_selected() { '*' } else { ' ' };
        println!(
            "  {marker}{i:>3} {:<24} min {:>12} max {:>12} smooth {}",
            channel.legend_name(),
            channel.min_value(),
            channel.max_value(),
            channel.smoothing_window()
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().or_else(default_config_path);
    let config = load_config(cli.config.as_deref())?;
    let _guard = init_logging(&config.logging);

    tracing::debug!("Using config {:?}", config_path);

    match cli.command {
        Command::Import { input, output } => {
            let codec = ContainerCodec::from_config(&config.container);
            let output = output.unwrap_or_else(|| fix_file_suffix(&input, codec.extension()));
            let mut dataset = import_text(&config, &input)
                .with_context(|| format!("Could not load {}", input.display()))?;

            dataset
                .save_as_with(&codec, &output)
                .with_context(|| format!("Could not save {}", output.display()))?;
            println!("{} -> {}", input.display(), output.display());
        }
        Command::Info { files, json } => {
            for path in &files {
                let dataset = open_any(&config, path)
                    .with_context(|| format!("Could not load {}", path.display()))?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&dataset.summary())?);
                } else {
                    print_summary(&dataset);
                }
            }
        }
    }

    Ok(())
}
