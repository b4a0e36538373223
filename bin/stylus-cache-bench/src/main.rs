//! Stylus Cache Bench CLI
//!
//! Measures how much gas and latency the Arbitrum program cache saves for a
//! deployed Stylus contract by comparing a cold and a warm initialization.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use std::fs;
use std::path::{Path, PathBuf};

use stylus_cache_bench::config::{parse_address, ConfigLayer};
use stylus_cache_bench::{
    BenchConfig, CacheBenchRunner, ChainClient, CredentialSource, RpcClient, TargetStatus,
    VendingMachine, VerdictAxis,
};

/// Stylus Cache Bench - cold vs warm program cache measurements
#[derive(Parser, Debug)]
#[command(name = "stylus-cache-bench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Optional TOML configuration file; flags and environment take precedence
    #[arg(short, long, global = true, env = "STYLUS_BENCH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evict, measure cold, cache, measure warm, and report the deltas
    Run(RunArgs),

    /// Show the target's cache state and the signing account without sending transactions
    Status(TargetArgs),

    /// Query or request cupcakes from the vending machine at the target address
    Cupcake {
        #[command(subcommand)]
        action: CupcakeAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CupcakeAction {
    /// Print a user's cupcake balance
    Balance(CupcakeArgs),

    /// Give a user a cupcake and print the new balance
    Give(CupcakeArgs),
}

#[derive(Args, Debug)]
pub struct CupcakeArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Recipient address [default: the signing account]
    pub user: Option<String>,

    /// Seconds to wait for the transaction to be mined [default: 30]
    #[arg(long, env = "STYLUS_CONFIRM_TIMEOUT")]
    pub timeout: Option<u64>,
}

/// Connection settings shared by every command
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Address of the deployed Stylus program
    #[arg(short, long, env = "STYLUS_TARGET")]
    pub target: Option<String>,

    /// RPC endpoint URL [default: http://localhost:8547]
    #[arg(short, long, env = "STYLUS_RPC_URL")]
    pub rpc: Option<String>,

    /// Signing key source: env:NAME or file:PATH [default: env:PRIVATE_KEY]
    #[arg(short, long, env = "STYLUS_KEY")]
    pub key: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Seconds to wait for each cache transaction to be mined [default: 30]
    #[arg(long, env = "STYLUS_CONFIRM_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Receipt polling interval in milliseconds [default: 250]
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Axis that decides the headline verdict [default: gas]
    #[arg(long, value_enum)]
    pub axis: Option<AxisArg>,

    /// Directory holding per-target lock files [default: system temp dir]
    #[arg(long)]
    pub lock_dir: Option<PathBuf>,

    /// Report format printed to stdout
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    pub format: FormatArg,

    /// Also write the JSON report to this path
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AxisArg {
    Gas,
    Latency,
    Both,
}

impl From<AxisArg> for VerdictAxis {
    fn from(v: AxisArg) -> Self {
        match v {
            AxisArg::Gas => VerdictAxis::Gas,
            AxisArg::Latency => VerdictAxis::Latency,
            AxisArg::Both => VerdictAxis::Both,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let file = match &cli.config {
        Some(path) => ConfigLayer::from_file(path).context("Failed to load config file")?,
        None => ConfigLayer::default(),
    };

    let command = async move {
        match cli.command {
            Commands::Run(args) => handle_run(args, file).await,
            Commands::Status(args) => handle_status(args, file).await,
            Commands::Cupcake { action } => handle_cupcake(action, file).await,
        }
    };

    tokio::select! {
        result = command => result,
        _ = tokio::signal::ctrl_c() => bail!("Interrupted"),
    }
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();
}

/// Handle the run command logic
async fn handle_run(args: RunArgs, file: ConfigLayer) -> Result<()> {
    let mut flags = target_layer(&args.target)?;
    flags.confirmation_timeout_secs = args.timeout;
    flags.poll_interval_ms = args.poll_ms;
    flags.verdict_axis = args.axis.map(VerdictAxis::from);
    flags.lock_dir = args.lock_dir;

    let config = flags.over(file).finish().context("Invalid configuration")?;
    let client = connect(&config)?;

    let report = CacheBenchRunner::new(&client, &config)
        .run()
        .await
        .context("Benchmark run failed")?;

    match args.format {
        FormatArg::Text => println!("{report}"),
        FormatArg::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let Some(out) = args.out {
        write_json(&out, &serde_json::to_string_pretty(&report)?)?;
    }

    Ok(())
}

/// Handle the status command logic
async fn handle_status(args: TargetArgs, file: ConfigLayer) -> Result<()> {
    let config = target_layer(&args)?
        .over(file)
        .finish()
        .context("Invalid configuration")?;
    let client = connect(&config)?;

    let status = TargetStatus::query(&client, config.target_address)
        .await
        .context("Status query failed")?;
    println!("{status}");

    Ok(())
}

/// Handle the cupcake command logic
async fn handle_cupcake(action: CupcakeAction, file: ConfigLayer) -> Result<()> {
    let (args, give) = match action {
        CupcakeAction::Balance(args) => (args, false),
        CupcakeAction::Give(args) => (args, true),
    };

    let mut flags = target_layer(&args.target)?;
    flags.confirmation_timeout_secs = args.timeout;
    let config = flags.over(file).finish().context("Invalid configuration")?;
    let client = connect(&config)?;

    let user = match args.user.as_deref() {
        Some(user) => parse_address(user)?,
        None => client.signer(),
    };
    let machine = VendingMachine::new(&client, &config);

    if give {
        let outcome = machine.give(user).await.context("Cupcake request failed")?;
        println!("{outcome}");
    } else {
        let balance = machine
            .balance_of(user)
            .await
            .context("Balance query failed")?;
        println!("{user}: {balance} cupcakes");
    }

    Ok(())
}

fn target_layer(args: &TargetArgs) -> Result<ConfigLayer> {
    Ok(ConfigLayer {
        target_address: args.target.as_deref().map(parse_address).transpose()?,
        rpc_endpoint: args.rpc.clone(),
        credential_source: args
            .key
            .as_deref()
            .map(str::parse::<CredentialSource>)
            .transpose()?,
        ..ConfigLayer::default()
    })
}

fn connect(config: &BenchConfig) -> Result<RpcClient> {
    log::debug!(
        "target {}, rpc {}, key {}",
        config.target_address,
        config.rpc_endpoint,
        config.credential_source
    );
    RpcClient::from_config(config).context("Failed to set up RPC client")
}

fn write_json(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
