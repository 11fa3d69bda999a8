mod display;

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Datelike, Utc};
use clap::{Args, Parser, Subcommand};
use finledger_core::{AliasTable, EngineConfig, Ledger, Reconciler, Reconciliation, Registry, plan_searches};
use finledger_store::{CorpusLayout, CoverageSnapshot};

/// Track which institutions' financial reports are on disk, and which are missing.
#[derive(Parser, Debug)]
#[command(name = "finledger", version)]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    /// JSON engine configuration; every field is optional.
    #[arg(long, global = true, env = "FINLEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// Year coverage is measured against (defaults to the current year).
    #[arg(long, global = true)]
    current_year: Option<i32>,

    /// Override the backward lookback, in years.
    #[arg(long, global = true)]
    lookback: Option<i32>,

    /// Override the forward window, in years.
    #[arg(long, global = true)]
    forward: Option<i32>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct PathArgs {
    /// Root directory; stored paths are relative to it.
    #[arg(long, global = true, env = "FINLEDGER_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Ledger CSV [default: <base-dir>/ledger.csv]
    #[arg(long, global = true, env = "FINLEDGER_LEDGER")]
    ledger: Option<PathBuf>,

    /// Institution registry CSV [default: <base-dir>/registry.csv]
    #[arg(long, global = true, env = "FINLEDGER_REGISTRY")]
    registry: Option<PathBuf>,

    /// Alias CSV replacing the built-in alias table.
    #[arg(long, global = true, env = "FINLEDGER_ALIASES")]
    aliases: Option<PathBuf>,

    /// Documents directory [default: <base-dir>/documents]
    #[arg(long, global = true, env = "FINLEDGER_DOCUMENTS")]
    documents: Option<PathBuf>,

    /// Extracts directory [default: <base-dir>/extracts]
    #[arg(long, global = true, env = "FINLEDGER_EXTRACTS")]
    extracts: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the corpus, reconcile it into the ledger and save.
    Reconcile {
        /// Also write a JSON coverage snapshot here.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Reconcile without saving, then list the searches that would fill the gaps.
    Plan,
    /// Rewrite absolute ledger paths relative to the base directory.
    Relativize,
}

struct Workspace {
    base_dir: PathBuf,
    ledger: PathBuf,
    registry: PathBuf,
    layout: CorpusLayout,
}

impl Workspace {
    fn from_args(args: &PathArgs) -> anyhow::Result<Self> {
        let base_dir = std::fs::canonicalize(&args.base_dir)
            .with_context(|| format!("base directory {}", args.base_dir.display()))?;
        let or_base = |p: &Option<PathBuf>, default: &str| p.clone().unwrap_or_else(|| base_dir.join(default));

        let mut layout = CorpusLayout::under(&base_dir);
        layout.documents_dir = or_base(&args.documents, "documents");
        layout.extracts_dir = Some(or_base(&args.extracts, "extracts"));

        Ok(Self {
            ledger: or_base(&args.ledger, "ledger.csv"),
            registry: or_base(&args.registry, "registry.csv"),
            base_dir,
            layout,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
    tracing::info!("finledger v{}", env!("CARGO_PKG_VERSION"));

    let workspace = Workspace::from_args(&cli.paths)?;
    let config = load_config(&cli)?;
    let current_year = cli.current_year.unwrap_or_else(|| Utc::now().year());

    match &cli.command {
        Command::Reconcile { snapshot } => {
            let registry = load_registry(&workspace, &cli.paths)?;
            let mut ledger = finledger_store::load_ledger(&workspace.ledger)?;
            let result = reconcile(&workspace, &registry, &config, &mut ledger, current_year)?;

            finledger_store::save_ledger(&workspace.ledger, &ledger)?;
            if let Some(path) = snapshot {
                CoverageSnapshot::from_report(&result.coverage, 0, Utc::now())
                    .write(path)
                    .context("writing coverage snapshot")?;
            }
            display::print_reconciliation(&result);
        }
        Command::Plan => {
            let registry = load_registry(&workspace, &cli.paths)?;
            let mut ledger = finledger_store::load_ledger(&workspace.ledger)?;
            let result = reconcile(&workspace, &registry, &config, &mut ledger, current_year)?;

            display::print_reconciliation(&result);
            println!();
            display::print_plan(&plan_searches(&result.coverage, &config.plan));
        }
        Command::Relativize => relativize(&workspace)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            EngineConfig::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(years) = cli.lookback {
        config.coverage.max_lookback = years;
    }
    if let Some(years) = cli.forward {
        config.coverage.max_forward = years;
    }
    config.validate().context("invalid engine configuration")?;
    Ok(config)
}

fn load_registry(workspace: &Workspace, args: &PathArgs) -> anyhow::Result<Registry> {
    let aliases = match &args.aliases {
        Some(path) => finledger_store::load_aliases(path).with_context(|| format!("alias table {}", path.display()))?,
        None => AliasTable::builtin(),
    };
    Ok(finledger_store::load_registry_or_empty(&workspace.registry, aliases))
}

fn reconcile(
    workspace: &Workspace,
    registry: &Registry,
    config: &EngineConfig,
    ledger: &mut Ledger,
    current_year: i32,
) -> anyhow::Result<Reconciliation> {
    let corpus = finledger_store::scan_corpus(&workspace.layout).context("scanning corpus")?;
    let observed_at = Utc::now().to_rfc3339();
    Ok(Reconciler::new(registry, config).reconcile(ledger, &corpus, current_year, &observed_at))
}

fn relativize(workspace: &Workspace) -> anyhow::Result<()> {
    let mut ledger = finledger_store::load_ledger(&workspace.ledger)?;
    let report = finledger_store::relativize(&mut ledger, &workspace.base_dir);
    if report.converted == 0 {
        println!("No absolute paths under {}", workspace.base_dir.display());
    } else {
        let backup = backup_path(&workspace.ledger);
        std::fs::copy(&workspace.ledger, &backup).with_context(|| format!("backing up to {}", backup.display()))?;
        finledger_store::save_ledger(&workspace.ledger, &ledger)?;
        println!("Converted {} paths (backup: {})", report.converted, backup.display());
    }
    for path in &report.outside {
        println!("  outside base directory: {path}");
    }
    Ok(())
}

/// `ledger.csv` → `ledger.csv.bak`.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_sits_next_to_ledger() {
        assert_eq!(backup_path(Path::new("/data/ledger.csv")), PathBuf::from("/data/ledger.csv.bak"));
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from(["finledger", "--lookback", "3", "--forward", "0", "plan"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.coverage.max_lookback, 3);
        assert_eq!(config.coverage.max_forward, 0);
        assert_eq!(config.coverage.lookback_floor, 2000);
    }

    #[test]
    fn out_of_range_window_is_rejected() {
        let cli = Cli::parse_from(["finledger", "--forward", "2147483647", "plan"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn snapshot_flag_parses() {
        let cli = Cli::parse_from(["finledger", "reconcile", "--snapshot", "out.json", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Reconcile { snapshot: Some(_) }));
    }
}
