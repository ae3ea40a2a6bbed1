use depsnap::cli::output;
use depsnap::cli::{BuildArgs, CliArgs, Commands, IngestArgs, RecordFailureArgs, StatusArgs};
use depsnap::{
    BuildError, DepsnapConfig, HttpQueueResolver, JsonDirStore, RawScan, ScanErrorType,
    ScanIngestService, SnapshotService, VERSION,
};

use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::process;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("depsnap v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let config = DepsnapConfig::default();
    if let Err(e) = config.validate() {
        error!("{e}");
        process::exit(2);
    }

    let exit_code = match &args.command {
        Commands::Ingest(ingest_args) => handle_ingest(ingest_args, &config),
        Commands::RecordFailure(failure_args) => handle_record_failure(failure_args, &config),
        Commands::Build(build_args) => handle_build(build_args, &config).await,
        Commands::Status(status_args) => handle_status(status_args, &config),
    };

    process::exit(exit_code);
}

fn handle_ingest(args: &IngestArgs, config: &DepsnapConfig) -> i32 {
    match ingest(args, config) {
        Ok(service_id) => {
            info!(service = %service_id, commit = %args.commit, "scan stored");
            0
        }
        Err(e) => {
            error!("Ingest failed: {e:#}");
            1
        }
    }
}

fn ingest(args: &IngestArgs, config: &DepsnapConfig) -> Result<String> {
    let contents = std::fs::read_to_string(&args.scan_file)
        .with_context(|| format!("failed to read scan report {}", args.scan_file.display()))?;
    let raw: RawScan = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse scan report {}", args.scan_file.display()))?;

    let mut store = open_store(args.scan_dir.as_ref(), config)?;
    let record = ScanIngestService::new()
        .process_and_store(&mut store, &raw, &args.commit)
        .context("failed to process and store scan")?;
    Ok(record.service_id)
}

fn handle_record_failure(args: &RecordFailureArgs, config: &DepsnapConfig) -> i32 {
    let error_type = match args.error_type.parse::<ScanErrorType>() {
        Ok(error_type) => error_type,
        Err(_) => {
            warn!(error_type = %args.error_type, "unrecognized error type, recording as UNKNOWN");
            ScanErrorType::Unknown
        }
    };

    let result = open_store(args.scan_dir.as_ref(), config).and_then(|mut store| {
        ScanIngestService::new()
            .record_failure(
                &mut store,
                &args.service_id,
                &args.commit,
                None,
                None,
                error_type,
                &args.message,
                None,
            )
            .map_err(Into::into)
    });

    match result {
        Ok(_) => {
            info!(service = %args.service_id, commit = %args.commit, "failure recorded");
            0
        }
        Err(e) => {
            error!("Recording failure failed: {e:#}");
            1
        }
    }
}

async fn handle_build(args: &BuildArgs, config: &DepsnapConfig) -> i32 {
    match build(args, config).await {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            if let Some(build_error) = e.downcast_ref::<BuildError>() {
                error!("Build failed: {build_error}");
            } else {
                error!("Build failed: {e:#}");
            }
            1
        }
    }
}

async fn build(args: &BuildArgs, config: &DepsnapConfig) -> Result<String> {
    let contents = std::fs::read_to_string(&args.request_file)
        .with_context(|| format!("failed to read build request {}", args.request_file.display()))?;
    let request = SnapshotService::<HttpQueueResolver>::parse_request(&contents)?;

    let store = open_store(args.scan_dir.as_ref(), config)?;
    let mut service = SnapshotService::new(HttpQueueResolver::from_config(config));
    let snapshot = service.build(&store, &request).await?;

    info!("{}", output::build_summary(&snapshot));

    let json = if args.compact {
        serde_json::to_string(&snapshot)?
    } else {
        serde_json::to_string_pretty(&snapshot)?
    };
    Ok(json)
}

fn handle_status(args: &StatusArgs, config: &DepsnapConfig) -> i32 {
    let lookup = match open_store(args.scan_dir.as_ref(), config).and_then(|store| {
        ScanIngestService::new()
            .find_by_service_and_commit(&store, &args.service_id, &args.commit)
            .map_err(Into::into)
    }) {
        Ok(lookup) => lookup,
        Err(e) => {
            error!("Status lookup failed: {e:#}");
            return 1;
        }
    };

    println!("{}", output::format_status(&lookup, args.format));

    if lookup.is_not_found() {
        3
    } else {
        0
    }
}

fn open_store(cli_dir: Option<&PathBuf>, config: &DepsnapConfig) -> Result<JsonDirStore> {
    let dir = cli_dir
        .cloned()
        .or_else(|| config.scan_dir.clone())
        .unwrap_or_else(|| PathBuf::from("depsnap-scans"));
    JsonDirStore::open(&dir).with_context(|| format!("failed to open scan store at {}", dir.display()))
}

fn init_logging_from_args(args: &CliArgs) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let level = if let Some(level_str) = &args.log_level {
            parse_level(level_str)
        } else if args.verbose {
            Level::DEBUG
        } else if args.quiet {
            Level::ERROR
        } else {
            let level_str = env::var("DEPSNAP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            parse_level(&level_str)
        };

        let mut filter = EnvFilter::from_default_env();

        if env::var("RUST_LOG").is_err() {
            filter = filter
                .add_directive(format!("depsnap={level}").parse().unwrap())
                .add_directive("h2=warn".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap());
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}

fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{level_str}', defaulting to INFO. Valid levels: trace, debug, info, warn, error"
            );
            Level::INFO
        }
    }
}
