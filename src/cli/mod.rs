pub mod output;

pub use output::OutputFormat;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Assembles application dependency snapshots from per-service scans
#[derive(Parser, Debug)]
#[command(
    name = "depsnap",
    about = "Assembles application dependency snapshots from per-service scans",
    version,
    long_about = "depsnap ingests per-service static-analysis scan reports and assembles \
                  composite application snapshots: a hierarchical app template plus a flat \
                  pool of function definitions, with cross-service calls expanded to their \
                  leaf dependencies."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    /// Enable verbose output (equivalent to --log-level debug)
    #[arg(short = 'v', long, global = true, help = "Increase verbosity")]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a raw scan report and store it
    #[command(
        about = "Process a raw scan report and store it",
        long_about = "Transforms a raw scanner report into its build-optimized form and \
                      stores it for later snapshot builds.\n\n\
                      Examples:\n  \
                      depsnap ingest scan.json --commit abc123\n  \
                      depsnap ingest scan.json --commit abc123 --scan-dir ./scans"
    )]
    Ingest(IngestArgs),

    /// Record a scan failure for a service revision
    #[command(
        about = "Record a scan failure for a service revision",
        long_about = "Stores a failure record for a (service, commit) pair. Builds that \
                      include the pair exclude the service and report the failure on the \
                      snapshot.\n\n\
                      Example:\n  \
                      depsnap record-failure SVC1 --commit abc123 --error-type SCAN_ERROR \
                      --message \"scanner crashed\""
    )]
    RecordFailure(RecordFailureArgs),

    /// Assemble a snapshot from a build request
    #[command(
        about = "Assemble a snapshot from a build request",
        long_about = "Builds the app template and function pool for the services named in \
                      the request file and prints the snapshot JSON to stdout.\n\n\
                      Example:\n  \
                      depsnap build request.json --scan-dir ./scans"
    )]
    Build(BuildArgs),

    /// Show the stored state of a service revision
    #[command(
        about = "Show the stored state of a service revision",
        long_about = "Reports whether a (service, commit) pair has a successful scan, a \
                      recorded failure, or nothing on record.\n\n\
                      Example:\n  \
                      depsnap status SVC1 --commit abc123"
    )]
    Status(StatusArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct IngestArgs {
    /// Path to the raw scan report JSON
    #[arg(value_name = "SCAN_FILE")]
    pub scan_file: PathBuf,

    /// Git commit hash of the scanned revision
    #[arg(short = 'c', long, value_name = "HASH")]
    pub commit: String,

    /// Scan store directory (default: DEPSNAP_SCAN_DIR or ./depsnap-scans)
    #[arg(long, value_name = "DIR")]
    pub scan_dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct RecordFailureArgs {
    /// Service artifact id
    #[arg(value_name = "SERVICE_ID")]
    pub service_id: String,

    /// Git commit hash of the scanned revision
    #[arg(short = 'c', long, value_name = "HASH")]
    pub commit: String,

    /// Error type (SCAN_ERROR, PARSE_ERROR, CODE_VIOLATION, PROCESSING_ERROR, UNKNOWN)
    #[arg(long, value_name = "TYPE", default_value = "UNKNOWN")]
    pub error_type: String,

    /// Brief error message
    #[arg(short = 'm', long, value_name = "MESSAGE")]
    pub message: String,

    /// Scan store directory (default: DEPSNAP_SCAN_DIR or ./depsnap-scans)
    #[arg(long, value_name = "DIR")]
    pub scan_dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Path to the build request JSON
    #[arg(value_name = "REQUEST_FILE")]
    pub request_file: PathBuf,

    /// Scan store directory (default: DEPSNAP_SCAN_DIR or ./depsnap-scans)
    #[arg(long, value_name = "DIR")]
    pub scan_dir: Option<PathBuf>,

    /// Emit compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    /// Service artifact id
    #[arg(value_name = "SERVICE_ID")]
    pub service_id: String,

    /// Git commit hash of the scanned revision
    #[arg(short = 'c', long, value_name = "HASH")]
    pub commit: String,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Scan store directory (default: DEPSNAP_SCAN_DIR or ./depsnap-scans)
    #[arg(long, value_name = "DIR")]
    pub scan_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ingest_command() {
        let args = CliArgs::parse_from(["depsnap", "ingest", "scan.json", "--commit", "abc123"]);
        match args.command {
            Commands::Ingest(ingest) => {
                assert_eq!(ingest.scan_file, PathBuf::from("scan.json"));
                assert_eq!(ingest.commit, "abc123");
                assert!(ingest.scan_dir.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_build_command_with_flags() {
        let args = CliArgs::parse_from([
            "depsnap", "-v", "build", "request.json", "--scan-dir", "/tmp/scans", "--compact",
        ]);
        assert!(args.verbose);
        match args.command {
            Commands::Build(build) => {
                assert_eq!(build.scan_dir, Some(PathBuf::from("/tmp/scans")));
                assert!(build.compact);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_status_format() {
        let args = CliArgs::parse_from([
            "depsnap", "status", "SVC1", "--commit", "abc", "--format", "json",
        ]);
        match args.command {
            Commands::Status(status) => assert_eq!(status.format, OutputFormat::Json),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_record_failure_defaults() {
        let args = CliArgs::parse_from([
            "depsnap",
            "record-failure",
            "SVC1",
            "--commit",
            "abc",
            "-m",
            "scanner crashed",
        ]);
        match args.command {
            Commands::RecordFailure(failure) => {
                assert_eq!(failure.error_type, "UNKNOWN");
                assert_eq!(failure.message, "scanner crashed");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
