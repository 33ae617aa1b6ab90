//! Batch installation.
//!
//! [`Installer::install`] runs a list of items strictly in order, one at a
//! time. Each item is detected, acquired and executed; any failure is
//! confined to that item and recorded as a `Failed` result. Only batch
//! cancellation stops the loop early.

use super::archive::{extract_zip, is_archive};
use super::download::{ArtifactFetcher, HttpFetcher};
use super::process::{installer_invocation, make_executable, shell_invocation, ProcessRunner, SystemRunner};
use super::progress::{percent, MESSAGE_DONE, MESSAGE_PREPARING};
use crate::event_log::Logger;
use crate::install::{Cancelled, InstallError, InstallOptions, InstallProgress};
use crate::{InstallMethod, InstallResult, InstallStatus, PresenceDetector, SoftwareItem};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

const MSG_ALREADY_INSTALLED: &str = "Already installed";
const MSG_SYSTEM_COMMAND: &str = "Running system command";
const MSG_DOWNLOADING: &str = "Downloading";
const MSG_EXTRACTING: &str = "Extracting";
const MSG_INSTALLING: &str = "Installing";
const MSG_POST_INSTALL: &str = "Running post-install steps";
const MSG_SUCCESS: &str = "Installed successfully";

/// Sequential installation engine.
///
/// Holds the presence detector, artifact fetcher, process runner and event
/// logger. [`Installer::new`] wires up the real implementations;
/// [`Installer::with_components`] accepts substitutes.
///
/// # Example
///
/// ```rust,no_run
/// use autoinstaller::{FileLogger, InstallOptions, Installer, SoftwareItem};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() {
///     let logger = Arc::new(FileLogger::new("log.txt"));
///     let installer = Installer::new(InstallOptions::default(), logger).unwrap();
///     let items = vec![SoftwareItem::download(
///         "VLC",
///         "https://get.videolan.org/vlc/3.0.20/win64/vlc-3.0.20-win64.exe",
///         "/S",
///     )];
///
///     let results = installer
///         .install(
///             &items,
///             |progress| println!("{progress}"),
///             |item, status, message| println!("{}: {status} ({message})", item.name),
///             &CancellationToken::new(),
///         )
///         .await;
///
///     match results {
///         Ok(results) => println!("{} item(s) processed", results.len()),
///         Err(cancelled) => println!("{cancelled}"),
///     }
/// }
/// ```
pub struct Installer {
    detector: PresenceDetector,
    fetcher: Arc<dyn ArtifactFetcher>,
    runner: Arc<dyn ProcessRunner>,
    logger: Arc<dyn Logger>,
    options: InstallOptions,
}

impl Installer {
    /// Installer using the platform detector, HTTP downloads and real
    /// processes.
    pub fn new(options: InstallOptions, logger: Arc<dyn Logger>) -> Result<Self, InstallError> {
        let fetcher = Arc::new(HttpFetcher::new(&options, logger.clone())?);
        Ok(Self::with_components(
            options,
            logger,
            PresenceDetector::new(),
            fetcher,
            Arc::new(SystemRunner::new()),
        ))
    }

    pub fn with_components(
        options: InstallOptions,
        logger: Arc<dyn Logger>,
        detector: PresenceDetector,
        fetcher: Arc<dyn ArtifactFetcher>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            detector,
            fetcher,
            runner,
            logger,
            options,
        }
    }

    pub fn detector(&self) -> &PresenceDetector {
        &self.detector
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Whether `item` is already present, using this installer's detector.
    pub fn is_installed(&self, item: &SoftwareItem) -> bool {
        self.detector.is_installed(item)
    }

    /// Install `items` in order.
    ///
    /// For each item this emits a "Preparing" tick, skips it if already
    /// installed, otherwise runs its system command or downloads and runs
    /// (or extracts) its artifact, then its post-install commands. Every
    /// status transition goes to `on_status`. Whatever the outcome, the item
    /// ends with a "Done" tick at the new overall percentage.
    ///
    /// # Returns
    ///
    /// - `Ok(results)` with exactly one result per item, in input order
    /// - `Err(Cancelled)` if `cancel` fired; it holds the results of the
    ///   items finished before the cancellation was noticed
    ///
    /// # Cancellation
    ///
    /// The token is checked before each item. A download or process wait in
    /// progress also stops when it fires; the batch then returns
    /// `Err(Cancelled)` at once and the interrupted item gets no result. A
    /// cancelled installer process is not killed.
    pub async fn install<P, S>(
        &self,
        items: &[SoftwareItem],
        on_progress: P,
        on_status: S,
        cancel: &CancellationToken,
    ) -> Result<Vec<InstallResult>, Cancelled>
    where
        P: Fn(InstallProgress) + Send + Sync,
        S: Fn(&SoftwareItem, InstallStatus, &str) + Send + Sync,
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        if total == 0 {
            on_progress(InstallProgress::new(100.0, "", MESSAGE_DONE));
            return Ok(results);
        }

        self.logger.info(&format!("Starting installation of {total} item(s)"));

        for (completed, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                self.logger.warn(&format!(
                    "Installation cancelled before {}; {} of {} item(s) processed",
                    item.name, completed, total
                ));
                return Err(Cancelled { completed: results });
            }

            let overall = percent(completed, total);
            on_progress(InstallProgress::new(overall, &item.name, MESSAGE_PREPARING));

            let span = tracing::info_span!("install_item", item = %item.name);
            let outcome = self
                .install_one(item, overall, &on_progress, &on_status, cancel)
                .instrument(span)
                .await;

            let result = match outcome {
                Ok(result) => result,
                Err(InstallError::Cancelled { .. }) => {
                    self.logger.warn(&format!(
                        "Installation cancelled during {}; {} of {} item(s) processed",
                        item.name, completed, total
                    ));
                    return Err(Cancelled { completed: results });
                }
                Err(e) => {
                    let message = e.to_string();
                    on_status(item, InstallStatus::Failed, &message);
                    self.logger.error(&format!("{}: failed - {}", item.name, message));
                    tracing::debug!(item = %item.name, fix = e.fix_suggestion(), "install failed");
                    InstallResult::new(&item.name, InstallStatus::Failed, message)
                }
            };
            results.push(result);

            on_progress(InstallProgress::new(
                percent(completed + 1, total),
                &item.name,
                MESSAGE_DONE,
            ));
        }

        let summary = crate::InstallSummary::from_results(&results);
        self.logger.info(&format!(
            "Installation finished: {} succeeded, {} failed, {} skipped",
            summary.succeeded, summary.failed, summary.skipped
        ));
        Ok(results)
    }

    async fn install_one<P, S>(
        &self,
        item: &SoftwareItem,
        overall: f64,
        on_progress: &P,
        on_status: &S,
        cancel: &CancellationToken,
    ) -> Result<InstallResult, InstallError>
    where
        P: Fn(InstallProgress) + Send + Sync,
        S: Fn(&SoftwareItem, InstallStatus, &str) + Send + Sync,
    {
        if self.detector.is_installed(item) {
            on_status(item, InstallStatus::AlreadyInstalled, MSG_ALREADY_INSTALLED);
            self.logger.info(&format!("{}: already installed", item.name));
            return Ok(InstallResult::new(
                &item.name,
                InstallStatus::AlreadyInstalled,
                MSG_ALREADY_INSTALLED,
            ));
        }

        match item.install_method {
            InstallMethod::SystemCommand => {
                let command = item
                    .command
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| InstallError::Configuration {
                        message: format!("{} has no command configured", item.name),
                        fix: "Set command in the catalog entry".to_string(),
                    })?;
                on_status(item, InstallStatus::Installing, MSG_SYSTEM_COMMAND);
                self.runner
                    .run(
                        command,
                        item.command_args.as_deref().unwrap_or_default(),
                        item.requires_admin,
                        cancel,
                    )
                    .await?;
            }
            InstallMethod::DownloadAndRun => {
                if item.download_source().is_none() {
                    return Err(InstallError::Configuration {
                        message: format!("{} has no download URL", item.name),
                        fix: "Set downloadUrl in the catalog entry".to_string(),
                    });
                }

                on_status(item, InstallStatus::Downloading, MSG_DOWNLOADING);
                let report = |download_percent: f64| {
                    on_progress(InstallProgress::new(
                        overall,
                        &item.name,
                        format!("{MSG_DOWNLOADING} {download_percent:.0}%"),
                    ));
                };
                let artifact = self.fetcher.fetch(item, &report, cancel).await?;

                if is_archive(&artifact) {
                    on_status(item, InstallStatus::Installing, MSG_EXTRACTING);
                    extract_zip(&artifact, &self.options.archive_dir).await?;
                    self.logger.info(&format!(
                        "{}: extracted to {}",
                        item.name,
                        self.options.archive_dir.display()
                    ));
                } else {
                    on_status(item, InstallStatus::Installing, MSG_INSTALLING);
                    let invocation = installer_invocation(&artifact, &item.silent_args);
                    if invocation.program == artifact.to_string_lossy() {
                        make_executable(&artifact).await?;
                    }
                    self.runner
                        .run(&invocation.program, &invocation.args, item.requires_admin, cancel)
                        .await?;
                }
            }
        }

        if !item.post_install_commands.is_empty() {
            on_status(item, InstallStatus::PostInstall, MSG_POST_INSTALL);
            for command in &item.post_install_commands {
                let invocation = shell_invocation(command);
                self.runner
                    .run(&invocation.program, &invocation.args, item.requires_admin, cancel)
                    .await?;
            }
        }

        on_status(item, InstallStatus::Success, MSG_SUCCESS);
        self.logger.info(&format!("{}: installed", item.name));
        Ok(InstallResult::new(&item.name, InstallStatus::Success, MSG_SUCCESS))
    }
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
