use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use yulc_core::{
    BuildSettings, ConsoleReporter, FsArtifactSink, Pipeline, RunReport, SolcResolver, YulConfig,
};

/// Compile every Yul and Yul+ source of a project into artifacts.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(long, value_name = "DIR", default_value = ".", help = "Project root")]
    root: PathBuf,

    #[arg(
        long,
        value_name = "DIR",
        default_value = "contracts",
        help = "Sources directory, relative to the project root"
    )]
    sources: PathBuf,

    #[arg(
        long,
        value_name = "DIR",
        default_value = "artifacts",
        help = "Artifacts directory, relative to the project root"
    )]
    artifacts: PathBuf,

    #[arg(
        long,
        value_name = "PATH",
        help = "Project config (defaults to <root>/yul.toml when present)"
    )]
    config: Option<PathBuf>,

    #[arg(long, value_name = "VERSION", help = "Override the configured solc version")]
    solc_version: Option<String>,

    #[arg(long, value_name = "PATH", help = "Use this solc binary")]
    solc: Option<PathBuf>,

    #[arg(
        long = "solc-dir",
        value_name = "DIR",
        help = "Extra directory holding solc-<version> binaries (repeatable)"
    )]
    solc_dirs: Vec<PathBuf>,

    #[arg(short, long, help = "Log pipeline stages")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let report = execute(&cli).await?;
    println!("Compiled {} Yul file(s)", report.sunk.len());
    if !report.is_success() {
        bail!("{} file(s) failed to compile", report.failures.len());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "yulc_core=debug,yulc_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn execute(cli: &Cli) -> Result<RunReport> {
    let settings = load_settings(cli)?;
    let resolver = build_resolver(cli);
    let reporter = ConsoleReporter::new();
    let mut sink = FsArtifactSink::new(cli.root.join(&cli.artifacts));

    let pipeline = Pipeline::new(
        &cli.root,
        cli.root.join(&cli.sources),
        settings,
        &resolver,
        &reporter,
    );
    Ok(pipeline.run(&mut sink).await)
}

fn load_settings(cli: &Cli) -> Result<BuildSettings> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let default_path = cli.root.join("yul.toml");
            if default_path.is_file() {
                load_config(&default_path)?
            } else {
                YulConfig::default()
            }
        }
    };
    let mut settings = config.settings();
    if let Some(version) = &cli.solc_version {
        settings.version = version.clone();
    }
    debug!(version = %settings.version, "resolved build settings");
    Ok(settings)
}

fn load_config(path: &Path) -> Result<YulConfig> {
    YulConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
}

fn build_resolver(cli: &Cli) -> SolcResolver {
    let mut resolver = SolcResolver::new();
    if let Some(solc) = &cli.solc {
        resolver = resolver.with_binary(solc);
    }
    for dir in &cli.solc_dirs {
        resolver = resolver.with_search_dir(dir);
    }
    if let Some(home) = std::env::var_os("HOME") {
        resolver = resolver.with_search_dir(PathBuf::from(home).join(".svm"));
    }
    resolver
}
