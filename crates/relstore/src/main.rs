//! Maintenance CLI for the release metadata the website is generated
//! from.

mod logging;

use std::io::Read as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use relstore_core::{
    Announcement, AnnouncementError, JsonStateFile, ReleaseRecord, ReleaseStatus, ReleaseStore,
    StatusChange, StoreError, StorePolicy,
};
use relstore_version::{ProjectVersion, VersionLike, VersionParseError};

/// Versions below this are assumed released even when nothing was ever
/// recorded for them; newer versions default to in-development trunk
/// data instead.
const DEV_DEFAULT_THRESHOLD: &str = "1.50.0";

/// Documentation path handed out for trunk-defaulted records.
const MASTER_DOCUMENTATION: &str = "/doc/libs/master/";

#[derive(Parser)]
#[command(name = "relstore", version)]
#[command(about = "Maintain the release metadata the website is generated from")]
struct Cli {
    /// Path of the release state file
    #[arg(long, default_value = "release-data.json")]
    state: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the record the website should treat as latest in a series
    Latest {
        /// A version in the series of interest, e.g. 1.55.0
        version: String,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import a pasted release announcement (directory URL + sha256sum output)
    Import {
        /// Read the announcement from this file instead of stdin
        file: Option<PathBuf>,
    },

    /// Mark a recorded version as released or back in development
    SetStatus {
        version: String,
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Record where a version's documentation is hosted
    SetDocumentation {
        version: String,
        path: String,
    },

    /// List every recorded version grouped by release series
    List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    Released,
    Dev,
}

impl From<StatusArg> for StatusChange {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Released => Self::Released,
            StatusArg::Dev => Self::Dev,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Announcement(#[from] AnnouncementError),

    #[error(transparent)]
    Version(#[from] VersionParseError),

    #[error("Failed to read announcement: {0}")]
    ReadInput(#[from] std::io::Error),
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(error) = run(cli) {
        log::error!("{error}");
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let state = JsonStateFile;
    let policy = StorePolicy {
        dev_default_threshold: DEV_DEFAULT_THRESHOLD
            .parse()
            .expect("threshold constant is a valid version"),
        master_documentation: MASTER_DOCUMENTATION.to_string(),
    };
    let mut store = ReleaseStore::load(&state, cli.state, policy)?;

    match cli.command {
        Command::Latest { version, json } => {
            let version = ProjectVersion::parse(&version)?;
            let record = store.latest_release(&version);
            if json {
                println!("{:#}", record_json(&record));
            } else {
                print_record(&record);
            }
        }
        Command::Import { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            let announcement: Announcement<ProjectVersion> = Announcement::parse(&text)?;
            println!(
                "Recorded {} download(s) for {}",
                announcement.downloads.len(),
                announcement.version
            );
            store.apply_announcement(announcement);
            store.save(&state)?;
        }
        Command::SetStatus { version, status } => {
            let version = ProjectVersion::parse(&version)?;
            store.set_release_status(&version, status.into())?;
            println!("{version} is now {}", status_text(status));
            store.save(&state)?;
        }
        Command::SetDocumentation { version, path } => {
            let version = ProjectVersion::parse(&version)?;
            store.set_documentation(&version, path);
            println!("Updated documentation for {version}");
            store.save(&state)?;
        }
        Command::List => {
            for (series, records) in store.all() {
                println!("series {series}:");
                for record in records.values() {
                    println!("  {}", summary_line(record));
                }
            }
        }
    }

    Ok(())
}

fn status_text(status: StatusArg) -> &'static str {
    match status {
        StatusArg::Released => "released",
        StatusArg::Dev => "in development",
    }
}

fn print_record(record: &ReleaseRecord<ProjectVersion>) {
    println!("{}", summary_line(record));
    if let Some(documentation) = &record.documentation {
        println!("  documentation: {documentation}");
    }
    if let Some(download_page) = &record.download_page {
        println!("  download page: {download_page}");
    }
    for (extension, download) in &record.downloads {
        println!(
            "  {extension} ({}): {} sha256={}",
            download.line_endings, download.url, download.sha256
        );
    }
}

fn summary_line(record: &ReleaseRecord<ProjectVersion>) -> String {
    match &record.status {
        ReleaseStatus::Dev => format!("{} (dev)", record.version),
        ReleaseStatus::Released { date: Some(date) } => {
            format!("{} (released {})", record.version, date.format("%Y-%m-%d"))
        }
        ReleaseStatus::Released { date: None } => format!("{} (released)", record.version),
    }
}

fn record_json(record: &ReleaseRecord<ProjectVersion>) -> serde_json::Value {
    let (status, date) = match &record.status {
        ReleaseStatus::Dev => ("dev", None),
        ReleaseStatus::Released { date } => ("released", date.map(|d| d.to_rfc3339())),
    };
    json!({
        "version": record.version.to_string(),
        "status": status,
        "release_date": date,
        "documentation": &record.documentation,
        "download_page": &record.download_page,
        "downloads": &record.downloads,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_constant_is_a_valid_version() {
        let threshold: ProjectVersion = DEV_DEFAULT_THRESHOLD.parse().expect("valid threshold");
        assert_eq!(threshold, ProjectVersion::new(1, 50, 0));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
