//! component-updater: keep an installed component current from its release feed.
//!
//! One update run is a blocking pipeline:
//! Feed → Version policy → Download link → Download → Archive install
//!
//! # Architecture
//!
//! - **Feed**: the newest entry of the project's release feed (`release-feed` crate)
//! - **Version policy**: compares the installed version with the entry's `v<version>` title
//! - **Download link**: read from the release's detail page (`release-feed` crate)
//! - **Download**: streamed into the staging directory
//! - **Archive install**: binaries staged for the next restart, data
//!   directories merged into the live tree without overwriting anything
//!
//! Every run ends in exactly one [`UpdateOutcome`]. Errors never escape
//! [`Updater::run`]; they are logged through `tracing` and turned into the
//! outcome instead. Whether auto-updating is allowed at all is for the host
//! to decide before calling in.

pub mod config;
pub mod download;
pub mod error;
pub mod install;
pub mod outcome;
pub mod updater;
pub mod version;

pub use config::{StagingPaths, UpdaterConfig};
pub use download::Downloader;
pub use error::{Result, UpdateError};
pub use install::{ArchiveInstaller, InstallReport, InstallState};
pub use outcome::{OutcomeRecord, UpdateOutcome};
pub use updater::{InstalledComponent, Updater};
pub use version::VersionPolicy;

/// Run one update for `component` with `config`.
///
/// Convenience wrapper around [`Updater::new`] and [`Updater::run`].
///
/// # Examples
///
/// ```no_run
/// use component_updater::{InstalledComponent, UpdateOutcome, UpdaterConfig};
///
/// let config = UpdaterConfig::for_project("coolplugin");
/// let component = InstalledComponent::new("CoolPlugin.jar", "1.0");
/// match component_updater::update(config, component) {
///     UpdateOutcome::Success => println!("update staged for next restart"),
///     UpdateOutcome::NoUpdateAvailable => println!("already current"),
///     failure => eprintln!("update failed: {failure}"),
/// }
/// ```
pub fn update(config: UpdaterConfig, component: InstalledComponent) -> UpdateOutcome {
    Updater::new(config, component).run()
}
