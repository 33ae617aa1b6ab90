//! # autoinstaller
//!
//! Unattended installation of a catalog of desktop software.
//!
//! Given a list of [`SoftwareItem`]s, each with a download source or system
//! command, silent-install arguments, an elevation flag and a detection
//! rule, the [`Installer`] checks which items are already present, downloads
//! and runs the missing ones one at a time, reports progress as it goes and
//! returns a per-item result list.
//!
//! ## Features
//!
//! - [`PresenceDetector`] answering "is this installed?" from a file path or
//!   the installed-programs list of the platform
//! - [`Installer::install`] running a batch sequentially with per-item
//!   failure isolation and cooperative cancellation
//! - [`HttpFetcher`] and [`SystemRunner`], the network and process
//!   boundaries, behind the [`ArtifactFetcher`] and [`ProcessRunner`] traits
//! - [`load_catalog`] reading a JSON catalog with a built-in fallback, and
//!   [`Catalog`] for selection and status bookkeeping
//! - [`FileLogger`], a timestamped append-only event log
//!
//! ## Example
//!
//! ```rust,no_run
//! use autoinstaller::{
//!     load_catalog, Catalog, FileLogger, InstallOptions, InstallSummary, Installer, CATEGORY_DEV,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let logger = Arc::new(FileLogger::new("log.txt"));
//!     let mut catalog = Catalog::new(load_catalog(Path::new("software.json"), logger.as_ref()).await);
//!     catalog.select_category(CATEGORY_DEV);
//!
//!     let installer = Installer::new(InstallOptions::default(), logger)?;
//!     let results = installer
//!         .install(
//!             &catalog.selected_items(),
//!             |progress| println!("{progress}"),
//!             |item, status, message| println!("{}: {status} {message}", item.name),
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//!
//!     let summary = InstallSummary::from_results(&results);
//!     println!("{} ok, {} failed, {} skipped", summary.succeeded, summary.failed, summary.skipped);
//!     Ok(())
//! }
//! ```

mod catalog;
mod detect;
pub mod detection;
mod event_log;
mod install;
mod install_status;
mod software_item;

pub use catalog::{
    default_items, find_default, load_catalog, Catalog, CatalogEntry, CATALOG_FILE_NAME,
    CATEGORY_DEV, CATEGORY_GAMES, CATEGORY_GENERAL,
};
pub use detect::PresenceDetector;
pub use detection::{DetectionError, InstalledPrograms, Scope, View};
pub use event_log::{FileLogger, LogLevel, Logger, TracingLogger};
pub use install::{
    artifact_file_name, installer_invocation, shell_invocation, split_args, ArtifactFetcher,
    Cancelled, HttpFetcher, InstallError, InstallOptions, InstallProgress, Installer, Invocation,
    ProcessRunner, SystemRunner, DEFAULT_ARTIFACT_EXTENSION, MESSAGE_DONE, MESSAGE_PREPARING,
};
pub use install_status::{InstallResult, InstallStatus, InstallSummary};
pub use software_item::{DetectionRule, InstallMethod, SoftwareItem};
