use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

mod analysis;
mod config;
mod discovery;
mod package_manager;
mod scaffold;
mod sync;
mod watch;

use analysis::{SourceAnalyzer, UsedPackages};
use config::Config;
use discovery::FileScanner;
use sync::{InteractivePrompt, PackageJson, SyncOptions, Synchronizer};
use watch::DependencyWatcher;

/// depwatch - keep package.json in sync with the imports your code actually uses
#[derive(Parser, Debug)]
#[command(name = "depwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the project directory to watch
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single sync cycle and exit instead of watching
    #[arg(long)]
    once: bool,

    /// Compute and print the plan without running any commands
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - errors only
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a watch script to package.json and create a default config file
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!("depwatch v{}", env!("CARGO_PKG_VERSION"));

    if let Some(Command::Init) = cli.command {
        return scaffold::init(&cli.path);
    }

    let config = load_config(&cli)?;
    let options = SyncOptions {
        dry_run: cli.dry_run,
    };

    if cli.once || !config.watch.on_save {
        return run_cycle(&config, &cli.path, options, !cli.quiet);
    }

    run_watch_mode(&config, &cli.path, options)
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(config_path) = &cli.config {
        Config::from_file(config_path)
    } else {
        Ok(Config::resolve(&cli.path))
    }
}

fn run_watch_mode(config: &Config, root: &Path, options: SyncOptions) -> Result<()> {
    let watcher = DependencyWatcher::new(config);
    let watch_root = root.to_path_buf();
    let config = config.clone();
    let root = root.to_path_buf();

    watcher
        .watch(&watch_root, move || {
            match run_cycle(&config, &root, options, false) {
                Ok(()) => {
                    println!();
                    println!("{}", "✓ In sync. Waiting for changes...".green());
                }
                Err(e) => {
                    // The cycle aborts, the watcher keeps running
                    eprintln!("{}: {}", "Sync error".red(), e);
                }
            }
            true
        })
        .map_err(|e| miette::miette!("Watch error: {}", e))?;

    Ok(())
}

/// One full scan → analyze → aggregate → diff → apply pass
fn run_cycle(config: &Config, root: &Path, options: SyncOptions, show_progress: bool) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let start = Instant::now();

    let scanner = FileScanner::new(config);
    let files = scanner.scan(root)?;

    // An empty scan still synchronizes: essential packages must be
    // ensured and stale declared dependencies removed either way.
    if files.is_empty() {
        println!("{}", "No source files found.".yellow());
    }

    let mut analyzer = SourceAnalyzer::new()
        .into_diagnostic()
        .wrap_err("Failed to initialize parsers")?;

    let progress = if show_progress && files.len() > 20 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}")
                .into_diagnostic()?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut used = UsedPackages::new();
    for file in &files {
        let absolute = root.join(file);
        match analyzer.analyze_file(&absolute) {
            Ok(analysis) => {
                if config.debug {
                    report_file_usage(file, &analysis);
                }
                used.merge(&analysis);
            }
            Err(e) => {
                // Parse failures skip the file; the scan continues
                warn!("Skipping {}: {}", file.display(), e);
            }
        }
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if used.is_empty() {
        debug!("No external package usage detected");
    }
    info!(
        "Analyzed {} files, {} packages in use",
        files.len(),
        used.len()
    );

    let manifest_path = root.join("package.json");
    let manifest = PackageJson::load(&manifest_path)
        .into_diagnostic()
        .wrap_err("Failed to read manifest; skipping this cycle")?;

    let synchronizer = Synchronizer::new(config, root, options);
    let plan = synchronizer.plan(&used, &manifest);
    synchronizer.apply(&plan, &InteractivePrompt);

    info!("Cycle completed in {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

/// Per-file used/unused diagnostics, shown when `debug` is enabled
fn report_file_usage(file: &Path, analysis: &analysis::FileAnalysis) {
    let used = analysis.used_packages();
    let unused = analysis.unused_packages();
    if used.is_empty() && unused.is_empty() {
        return;
    }

    println!("{}", file.display().to_string().bold());
    if !used.is_empty() {
        println!("  {} {} used: {}", "✓".green(), used.len(), used.join(", "));
    }
    if !unused.is_empty() {
        println!(
            "  {} {} unused: {}",
            "!".yellow(),
            unused.len(),
            unused.join(", ")
        );
    }
}
