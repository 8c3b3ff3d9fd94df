/*!
 * Driftguard CLI - Command Line Interface
 */

use clap::{Args, Parser, Subcommand, ValueEnum};
use driftguard::{
    config::{DriftguardConfig, LogLevel},
    error::{DriftguardError, Result, EXIT_SUCCESS},
    logging,
    policy::{default_payload, PolicyPayload, PolicyType},
    sentinel::Sentinel,
    FleetSnapshot,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "driftguard")]
#[command(version, about = "Anomaly detection and policy enforcement for managed databases", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides the config file)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate policies and show their defaults
    #[command(subcommand)]
    Policy(PolicyCommand),

    /// Scan a fleet snapshot for anomalies
    Scan(ScanArgs),
}

#[derive(Subcommand)]
enum PolicyCommand {
    /// Validate a policy payload
    Validate {
        /// Policy type, e.g. bb.policy.window
        #[arg(long = "type", value_name = "TYPE")]
        policy_type: String,

        /// JSON payload; empty means the default
        #[arg(long, value_name = "JSON", default_value = "")]
        payload: String,
    },

    /// Print the default payload of a policy type
    Default {
        /// Policy type, e.g. bb.policy.backup-plan
        #[arg(long = "type", value_name = "TYPE")]
        policy_type: String,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Fleet snapshot (JSON)
    #[arg(long, value_name = "FILE")]
    fleet: PathBuf,

    /// Run a single cycle and print the active anomalies
    #[arg(long)]
    once: bool,

    /// Seconds between cycles
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,

    /// Instances scanned at the same time
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Upper bound in seconds on each store and driver call
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Policy(command) => handle_policy(command),
        Commands::Scan(args) => {
            let mut config = match cli.config {
                Some(ref path) => DriftguardConfig::from_file(path)?,
                None => DriftguardConfig::default(),
            };

            // Command line flags override the config file
            if let Some(level) = cli.log_level {
                config.log_level = level.into();
            }
            if cli.log.is_some() {
                config.log_file = cli.log;
            }
            config.verbose |= cli.verbose;
            apply_scan_overrides(&mut config, &args);
            config.validate()?;

            handle_scan(config, &args.fleet, args.once)
        }
    }
}

fn apply_scan_overrides(config: &mut DriftguardConfig, args: &ScanArgs) {
    if let Some(interval) = args.interval {
        config.sentinel.scan_interval_s = interval;
    }
    if let Some(workers) = args.workers {
        config.sentinel.max_parallel_scans = workers;
    }
    if let Some(timeout) = args.timeout {
        config.sentinel.call_timeout_s = Some(timeout);
    }
}

fn handle_policy(command: PolicyCommand) -> Result<()> {
    match command {
        PolicyCommand::Validate {
            policy_type,
            payload,
        } => {
            let policy_type: PolicyType = policy_type.parse()?;
            let parsed = PolicyPayload::parse(policy_type, &payload)?;
            println!("✅ Valid {} policy", policy_type);
            println!("{}", parsed.to_json()?);
            Ok(())
        }
        PolicyCommand::Default { policy_type } => {
            let policy_type: PolicyType = policy_type.parse()?;
            println!("{}", default_payload(policy_type)?);
            Ok(())
        }
    }
}

fn handle_scan(config: DriftguardConfig, fleet_path: &Path, once: bool) -> Result<()> {
    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let fleet = FleetSnapshot::load(fleet_path)?.into_fleet()?;
    let sentinel = Sentinel::new(fleet.collaborators(), config.sentinel.clone())?;
    let runtime = tokio::runtime::Runtime::new()?;

    if once {
        let report = runtime
            .block_on(sentinel.run_once())
            .ok_or(DriftguardError::CycleAborted)?;

        println!("{}", serde_json::to_string_pretty(&fleet.ledger.active())?);

        if report.checks_failed > 0 || report.instances_failed > 0 {
            return Err(DriftguardError::PartialScan {
                checks_failed: report.checks_failed,
                instances_failed: report.instances_failed,
            });
        }
        return Ok(());
    }

    runtime.block_on(async {
        let handle = sentinel.start();
        tokio::signal::ctrl_c().await?;
        info!("🛑 Interrupted, stopping Sentinel");
        handle.abort();
        Ok::<(), DriftguardError>(())
    })
}
