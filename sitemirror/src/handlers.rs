use clap::ArgMatches;
use colored::Colorize;
use sitemirror_core::mirror::{MirrorOptions, MirrorSummary, execute_mirror};
use sitemirror_core::report::{ReportFormat, generate_report, save_report};
use sitemirror_core::{MirrorConfig, MirrorError};
use sitemirror_scanner::FailurePolicy;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Flag values of the `mirror` subcommand that can override the config file
#[derive(Debug, Clone, Default)]
pub struct MirrorArgs {
    pub url: Option<Url>,
    pub output_dir: Option<PathBuf>,
    pub threads: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub isolate_failures: bool,
    pub config: Option<PathBuf>,
}

impl MirrorArgs {
    pub fn from_matches(sub_matches: &ArgMatches) -> Self {
        Self {
            url: sub_matches.get_one::<Url>("url").cloned(),
            output_dir: sub_matches.get_one::<PathBuf>("output-dir").cloned(),
            threads: sub_matches.get_one::<usize>("threads").copied(),
            timeout_secs: sub_matches.get_one::<u64>("timeout").copied(),
            isolate_failures: sub_matches.get_flag("isolate-failures"),
            config: sub_matches.get_one::<PathBuf>("config").cloned(),
        }
    }
}

/// Load the config file if one was given and lay the command-line flags over it
pub fn resolve_config(args: &MirrorArgs) -> Result<MirrorConfig, String> {
    let mut config = match args.config {
        Some(ref path) => MirrorConfig::from_file(path).map_err(|e| e.to_string())?,
        None => MirrorConfig::default(),
    };

    if let Some(ref url) = args.url {
        config.base_url = Some(url.as_str().to_string());
    }
    if let Some(ref output_dir) = args.output_dir {
        config.output_dir = output_dir.display().to_string();
    }
    if let Some(threads) = args.threads {
        config.max_in_flight = threads;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.timeout_secs = timeout_secs;
    }
    if args.isolate_failures {
        config.failure_policy = FailurePolicy::Isolate;
    }

    // A base URL from the config file may be written without a scheme
    config.base_url = match config.base_url {
        Some(ref url) => Some(
            parse_url_line(url).ok_or_else(|| format!("Invalid site URL '{}'", url))?,
        ),
        None => return Err("Either --url or base_url in the config file must be provided".to_string()),
    };

    Ok(config)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(line) {
        if url.has_host() {
            return Some(line.to_string());
        }
    }

    let with_scheme = format!("http://{}", line);
    match Url::parse(&with_scheme) {
        Ok(url) if url.has_host() => Some(with_scheme),
        _ => None,
    }
}

/// One-line description of a failed run, naming the phase and path where known
pub fn describe_failure(err: &MirrorError) -> String {
    match err.phase() {
        Some(phase) => format!("Mirror failed during {} phase: {}", phase, err),
        None => format!("Mirror failed: {}", err),
    }
}

pub fn print_banner() {
    println!(
        "{} {}",
        "sitemirror".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    println!("{}", "crawl a site, mirror its pages to disk".bright_black());
    println!();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_run_configuration(options: &MirrorOptions) {
    print_divider();
    println!("{}", "  SITE MIRROR".bright_white().bold());
    print_divider();
    println!(
        "{} Site: {}",
        "→".blue(),
        options.base_url.bright_white()
    );
    println!(
        "{} Output: {}",
        "→".blue(),
        options.output_dir.display().to_string().bright_white()
    );
    println!("{} Max in flight: {}", "→".blue(), options.max_in_flight);
    println!("{} Timeout: {}s", "→".blue(), options.timeout_secs);
    let policy = match options.failure_policy {
        FailurePolicy::FailFast => "fail fast (abort on first fetch error)",
        FailurePolicy::Isolate => "isolate (record failed pages and continue)",
    };
    println!("{} Failures: {}", "→".blue(), policy);
    println!();
}

fn init_tracing() {
    // RUST_LOG controls verbosity; warnings and errors only by default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn emit_report(summary: &MirrorSummary, format: ReportFormat, report_path: Option<&PathBuf>) {
    let report = match generate_report(summary, format) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} Failed to generate report: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    match report_path {
        Some(path) => match save_report(&report, path) {
            Ok(()) => println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            ),
            Err(e) => {
                eprintln!(
                    "{} Failed to save report to {}: {}",
                    "✗".red().bold(),
                    path.display(),
                    e
                );
                std::process::exit(1);
            }
        },
        None => print!("{}", report),
    }
}

pub async fn handle_mirror(sub_matches: &ArgMatches, quiet: bool) {
    init_tracing();

    let args = MirrorArgs::from_matches(sub_matches);
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let report_path = sub_matches.get_one::<PathBuf>("report");

    let options = match resolve_config(&args).and_then(|config| {
        config.into_options(!quiet).map_err(|e| e.to_string())
    }) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if !quiet {
        print_run_configuration(&options);
    }

    let progress_callback = if quiet {
        None
    } else {
        let callback: sitemirror_core::MirrorProgressCallback = Arc::new(|msg: String| {
            println!("{} {}", "→".blue(), msg);
        });
        Some(callback)
    };

    let summary = match execute_mirror(options, progress_callback).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), describe_failure(&e));
            std::process::exit(1);
        }
    };

    if !quiet {
        println!("\n{} Mirror complete!\n", "✓".green().bold());
    }

    emit_report(&summary, format, report_path);
}
