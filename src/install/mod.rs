//! Installation pipeline.
//!
//! [`Installer`] drives a batch of [`SoftwareItem`](crate::SoftwareItem)s
//! through detection, download, execution and post-install commands. The
//! network and process boundaries are traits ([`ArtifactFetcher`],
//! [`ProcessRunner`]) so the pipeline can run without either.
//!
//! # Example
//!
//! ```rust,no_run
//! use autoinstaller::{default_items, InstallOptions, Installer, TracingLogger};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let installer = Installer::new(InstallOptions::default(), Arc::new(TracingLogger))?;
//!     let items: Vec<_> = default_items()
//!         .into_iter()
//!         .filter(|item| item.has_name("Git"))
//!         .collect();
//!
//!     let results = installer
//!         .install(&items, |p| println!("{p}"), |_, _, _| {}, &CancellationToken::new())
//!         .await?;
//!     for result in results {
//!         println!("{}: {}", result.name, result.status);
//!     }
//!     Ok(())
//! }
//! ```

mod archive;
mod download;
mod errors;
mod executor;
mod path_finder;
mod process;
mod progress;

pub use download::{artifact_file_name, ArtifactFetcher, HttpFetcher, DEFAULT_ARTIFACT_EXTENSION};
pub use errors::{Cancelled, InstallError};
pub use executor::Installer;
pub use process::{
    installer_invocation, shell_invocation, split_args, Invocation, ProcessRunner, SystemRunner,
};
pub use progress::{InstallOptions, InstallProgress, MESSAGE_DONE, MESSAGE_PREPARING};
