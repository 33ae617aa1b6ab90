use anyhow::{bail, Context, Result};
use autoinstaller::{
    load_catalog, Catalog, FileLogger, InstallOptions, InstallResult, InstallSummary, Installer,
    Logger, PresenceDetector, CATALOG_FILE_NAME,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const LOG_FILE_NAME: &str = "log.txt";

#[derive(Parser, Debug)]
#[command(version, about = "Unattended installer for developer, gaming and everyday software")]
struct Args {
    /// Catalog file (default: software.json next to the executable)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Event log file (default: log.txt next to the executable)
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    sub: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show the catalog grouped by category
    List,
    /// Check which catalog items are already installed
    Refresh,
    /// Install the named items, a category, or everything
    Install {
        /// Item names (case-insensitive)
        names: Vec<String>,

        /// Install every catalog item
        #[arg(long, conflicts_with_all = ["names", "category"])]
        all: bool,

        /// Install every item of one category
        #[arg(long, short = 'c', conflicts_with = "names")]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("autoinstaller=info")),
        )
        .init();

    match run(Args::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("autoinstaller error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the command ran but something did not succeed.
async fn run(args: Args) -> Result<bool> {
    let base = exe_dir()?;
    let log_path = args.log.unwrap_or_else(|| base.join(LOG_FILE_NAME));
    let catalog_path = args.catalog.unwrap_or_else(|| base.join(CATALOG_FILE_NAME));
    let logger = Arc::new(FileLogger::new(log_path));

    let items = load_catalog(&catalog_path, logger.as_ref()).await;
    let mut catalog = Catalog::new(items);
    tracing::info!(path = %catalog_path.display(), items = catalog.len(), "catalog loaded");

    match args.sub {
        Cmd::List => {
            print_catalog(&catalog);
            Ok(true)
        }
        Cmd::Refresh => {
            catalog.refresh_installed(&PresenceDetector::new()).await;
            print_catalog(&catalog);
            logger.info("Installed programs checked");
            Ok(true)
        }
        Cmd::Install {
            names,
            all,
            category,
        } => {
            if all {
                catalog.select_all();
            } else if let Some(category) = category {
                if catalog.select_category(&category) == 0 {
                    bail!("no catalog items in category {category:?}");
                }
            } else if names.is_empty() {
                bail!("nothing selected; pass item names, --category or --all");
            } else {
                let unknown = catalog.select_names(&names);
                if !unknown.is_empty() {
                    bail!("unknown item(s): {}", unknown.join(", "));
                }
            }
            install(catalog, logger).await
        }
    }
}

async fn install(mut catalog: Catalog, logger: Arc<FileLogger>) -> Result<bool> {
    let installer = Installer::new(InstallOptions::default(), logger)?;
    let items = catalog.selected_items();
    catalog.mark_queued();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling installation...");
            on_ctrl_c.cancel();
        }
    });

    let catalog = Mutex::new(catalog);
    let outcome = installer
        .install(
            &items,
            |progress| println!("{progress}"),
            |item, status, message| {
                println!("  {}: {status} - {message}", item.name);
                if let Ok(mut catalog) = catalog.lock() {
                    catalog.apply_status(&item.name, status, message);
                }
            },
            &cancel,
        )
        .await;

    match outcome {
        Ok(results) => {
            print_summary(&results);
            Ok(!InstallSummary::from_results(&results).has_failures())
        }
        Err(cancelled) => {
            print_summary(&cancelled.completed);
            println!("{cancelled}");
            Ok(false)
        }
    }
}

fn exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to locate the executable")?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

fn print_catalog(catalog: &Catalog) {
    for category in catalog.categories() {
        println!("{category}");
        for entry in catalog
            .entries()
            .iter()
            .filter(|entry| entry.item.category == category)
        {
            let mark = if entry.installed { "installed" } else { "" };
            println!("  {:<28} {}", entry.item.name, mark);
        }
    }
}

fn print_summary(results: &[InstallResult]) {
    println!();
    println!("{:<28} {:<18} Message", "Item", "Status");
    for result in results {
        println!("{:<28} {:<18} {}", result.name, result.status.to_string(), result.message);
    }
    let summary = InstallSummary::from_results(results);
    println!(
        "\n{} succeeded, {} failed, {} skipped",
        summary.succeeded, summary.failed, summary.skipped
    );
}
