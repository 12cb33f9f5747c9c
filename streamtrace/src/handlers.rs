use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use streamtrace_capture::{Archive, BodySource, CapturedExchange, load_har};
use streamtrace_core::{
    DiagramFormat, RegistryOptions, ResolveOptions, media_exchanges, render_diagram,
    resolve_capture, save_diagram,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Where a recording is read from
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureSource {
    Har(PathBuf),
    Archive(PathBuf),
}

impl CaptureSource {
    pub fn from_args(har: Option<&String>, archive: Option<&String>) -> Result<Self> {
        match (har, archive) {
            (Some(har), None) => Ok(CaptureSource::Har(expand_path(har))),
            (None, Some(archive)) => Ok(CaptureSource::Archive(expand_path(archive))),
            (Some(_), Some(_)) => bail!("Only one of --har or --archive may be provided"),
            (None, None) => bail!("Either --har or --archive must be provided"),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            CaptureSource::Har(path) | CaptureSource::Archive(path) => path,
        }
    }
}

/// Exchanges of a recording together with the store their bodies live in
pub struct LoadedCapture {
    pub exchanges: Vec<CapturedExchange>,
    pub bodies: Box<dyn BodySource>,
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Load a recording. A plain HAR only has its inline bodies; an archive
/// resolves `_file` references against its own entries.
pub fn load_capture(source: &CaptureSource) -> Result<LoadedCapture> {
    match source {
        CaptureSource::Har(path) => {
            let exchanges = load_har(path)
                .with_context(|| format!("Failed to read HAR file {}", path.display()))?;
            let bodies: HashMap<String, Vec<u8>> = HashMap::new();
            Ok(LoadedCapture {
                exchanges,
                bodies: Box::new(bodies),
            })
        }
        CaptureSource::Archive(path) => {
            let archive = Archive::open(path)
                .with_context(|| format!("Failed to open archive {}", path.display()))?;
            let exchanges = archive
                .har()
                .with_context(|| format!("Failed to read recording in {}", path.display()))?;
            info!(
                "Loaded {} exchanges and {} archive entries",
                exchanges.len(),
                archive.len()
            );
            Ok(LoadedCapture {
                exchanges,
                bodies: Box::new(archive),
            })
        }
    }
}

pub fn resolve_options(keep_assets: bool, no_direct: bool) -> ResolveOptions {
    ResolveOptions {
        registry: RegistryOptions {
            skip_static_assets: !keep_assets,
        },
        match_direct_urls: !no_direct,
    }
}

/// Resolve a loaded recording and render its provenance path
pub fn render_capture(
    capture: &LoadedCapture,
    options: &ResolveOptions,
    format: &DiagramFormat,
) -> Result<String> {
    let mut resolution = resolve_capture(&capture.exchanges, &*capture.bodies, options)?;
    let path = resolution.graph.extract_path();

    if !path.is_connected() {
        tracing::warn!("Target is not connected to the initial page load");
    }

    render_diagram(&path, &resolution.unexplained, format).context("Failed to render diagram")
}

/// `(position, url, mime type)` of every media exchange
pub fn list_targets(exchanges: &[CapturedExchange]) -> Vec<(usize, String, Option<String>)> {
    media_exchanges(exchanges)
        .into_iter()
        .map(|pos| {
            let exchange = &exchanges[pos];
            (pos, exchange.url.clone(), exchange.mime_type.clone())
        })
        .collect()
}

pub fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("streamtrace=debug,streamtrace_core=debug,streamtrace_capture=debug"),
        _ => EnvFilter::new("streamtrace=trace,streamtrace_core=trace,streamtrace_capture=trace"),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Goes to stderr so stdout carries only the rendered document.
pub fn print_banner() {
    eprintln!(
        "{} {}",
        "streamtrace".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    eprintln!("{}", "where did that stream come from?".bright_black());
    eprintln!();
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn fail(spinner: &ProgressBar, e: anyhow::Error) -> ! {
    spinner.finish_and_clear();
    eprintln!("{} {}", "✗".red().bold(), format!("{:#}", e).red());
    std::process::exit(1);
}

pub fn handle_resolve(args: &ArgMatches, quiet: bool) {
    let spinner = spinner(quiet);

    let source = match CaptureSource::from_args(
        args.get_one::<String>("har"),
        args.get_one::<String>("archive"),
    ) {
        Ok(source) => source,
        Err(e) => fail(&spinner, e),
    };
    let format = args
        .get_one::<String>("format")
        .and_then(|f| DiagramFormat::from_str(f))
        .unwrap_or(DiagramFormat::DrawIo);
    let options = resolve_options(args.get_flag("keep-assets"), args.get_flag("no-direct"));

    spinner.set_message(format!("Loading {}", source.path().display()));
    let capture = match load_capture(&source) {
        Ok(capture) => capture,
        Err(e) => fail(&spinner, e),
    };

    spinner.set_message(format!("Resolving {} exchanges", capture.exchanges.len()));
    let content = match render_capture(&capture, &options, &format) {
        Ok(content) => content,
        Err(e) => fail(&spinner, e),
    };
    spinner.finish_and_clear();

    match args.get_one::<String>("output") {
        Some(output) => {
            let output = expand_path(output);
            if let Err(e) = save_diagram(&content, &output) {
                fail(
                    &spinner,
                    anyhow::Error::new(e)
                        .context(format!("Failed to write {}", output.display())),
                );
            }
            if !quiet {
                println!(
                    "{} Diagram saved to {}",
                    "✓".green().bold(),
                    output.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", content),
    }
}

pub fn handle_targets(args: &ArgMatches, quiet: bool) {
    let spinner = spinner(quiet);

    let source = match CaptureSource::from_args(
        args.get_one::<String>("har"),
        args.get_one::<String>("archive"),
    ) {
        Ok(source) => source,
        Err(e) => fail(&spinner, e),
    };

    spinner.set_message(format!("Loading {}", source.path().display()));
    let capture = match load_capture(&source) {
        Ok(capture) => capture,
        Err(e) => fail(&spinner, e),
    };
    spinner.finish_and_clear();

    let targets = list_targets(&capture.exchanges);
    if targets.is_empty() {
        eprintln!("{} {}", "✗".red().bold(), "No media requests found".red());
        std::process::exit(1);
    }

    for (i, (pos, url, mime_type)) in targets.iter().enumerate() {
        let marker = if i == 0 { "→".green().bold() } else { "•".blue() };
        let mime = mime_type
            .as_deref()
            .map(|m| format!("  {}", m).bright_black().to_string())
            .unwrap_or_default();
        println!("{} [{}] {}{}", marker, pos, url, mime);
    }

    if !quiet && targets.len() > 1 {
        println!();
        println!(
            "{} {} is traced; later media requests are ignored",
            "→".blue(),
            targets[0].1.bright_white()
        );
    }
}
