/// Version injected at compile time via AZAPPS_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AZAPPS_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{bail, Context, Result};
use azapps::appservice::{LinuxFunctionAppSlot, LinuxFunctionAppSlotModel};
use azapps::arm::auth::{AzureCliCredential, EnvironmentCredential, TokenCredential};
use azapps::arm::http::{format_arm_error, ArmHttpClient, DEFAULT_RETRY_DELAY};
use azapps::arm::{ApiError, ArmClient};
use azapps::config::Config;
use azapps::ids::{FunctionAppSlotId, ResourceId};
use azapps::resource::{Resource, Runner};
use azapps::{Clients, ReadOutcome};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Manage Azure Linux Function App slots from desired-state files
#[derive(Parser, Debug)]
#[command(name = "azapps", version = VERSION, about, long_about = None)]
struct Args {
    /// Azure subscription to use
    #[arg(short, long, global = true)]
    subscription: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a slot and print its recorded state
    Create {
        /// Desired state (YAML or JSON)
        file: PathBuf,
    },
    /// Print the current state of a slot
    Read {
        id: String,
        /// Last recorded state, used to keep its spelling of normalized values
        #[arg(long)]
        prior: Option<PathBuf>,
    },
    /// Apply a desired state to an existing slot
    Update {
        id: String,
        /// Desired state (YAML or JSON)
        file: PathBuf,
        /// Last recorded state; read from the API when omitted
        #[arg(long)]
        prior: Option<PathBuf>,
    },
    /// Delete a slot
    Delete { id: String },
    /// Check a desired-state file without calling the API
    Validate { file: PathBuf },
    /// Print the field table
    Schema,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("azapps {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("azapps").join("azapps.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".azapps").join("azapps.log");
    }
    PathBuf::from("azapps.log")
}

fn load_model(path: &Path) -> Result<LinuxFunctionAppSlotModel> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn parse_id(id: &str) -> Result<FunctionAppSlotId> {
    FunctionAppSlotId::parse(id).context("invalid slot ID")
}

fn print_model(model: &LinuxFunctionAppSlotModel) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(model)?);
    Ok(())
}

/// `ARM_ACCESS_TOKEN` when set, the Azure CLI otherwise
fn credential() -> Arc<dyn TokenCredential> {
    if std::env::var(EnvironmentCredential::VARIABLE).is_ok() {
        tracing::debug!("using token from {}", EnvironmentCredential::VARIABLE);
        Arc::new(EnvironmentCredential)
    } else {
        tracing::debug!("using Azure CLI credentials");
        Arc::new(AzureCliCredential::new())
    }
}

fn build_runner(
    config: &Config,
    subscription: Option<&str>,
    slot: LinuxFunctionAppSlot,
) -> Result<Runner<LinuxFunctionAppSlot>> {
    let subscription = config
        .effective_subscription(subscription)
        .context("no subscription configured; pass --subscription or run 'az account set'")?;
    tracing::info!("using subscription {}", subscription);

    let endpoint = config.effective_endpoint();
    let http = ArmHttpClient::new(endpoint)?.with_retries(config.max_retries(), DEFAULT_RETRY_DELAY);
    let client = ArmClient::new(endpoint, &subscription, credential())?.with_http(http);

    let clients = Clients::new(Arc::new(client), subscription)
        .with_poll_interval(config.poll_interval())
        .with_storage_endpoint_suffix(config.effective_storage_endpoint_suffix());
    let timeouts = slot.timeouts().with_overrides(&config.timeouts);

    Ok(Runner::new(slot, clients, timeouts))
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load();
    let slot = LinuxFunctionAppSlot::new().context("loading the resource schema")?;

    match &args.command {
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(slot.schema())?);
            return Ok(());
        }
        Command::Validate { file } => {
            let model = load_model(file)?;
            slot.validate(&model)?;
            println!("{} is valid", file.display());
            return Ok(());
        }
        _ => {}
    }

    let runner = build_runner(&config, args.subscription.as_deref(), slot)?;

    match args.command {
        Command::Create { file } => {
            let desired = load_model(&file)?;
            let id = runner.create(&desired).await?;
            eprintln!("Created {}", id);
            match runner.read(&id, Some(&desired)).await? {
                ReadOutcome::Present(state) => print_model(&state)?,
                ReadOutcome::Gone => bail!("{} disappeared right after creation", id),
            }
        }
        Command::Read { id, prior } => {
            let id = parse_id(&id)?;
            let prior = prior.as_deref().map(load_model).transpose()?;
            match runner.read(&id, prior.as_ref()).await? {
                ReadOutcome::Present(state) => print_model(&state)?,
                ReadOutcome::Gone => eprintln!("{} no longer exists", id),
            }
        }
        Command::Update { id, file, prior } => {
            let id = parse_id(&id)?;
            let desired = load_model(&file)?;
            let prior = match prior {
                Some(path) => load_model(&path)?,
                None => match runner.read(&id, Some(&desired)).await? {
                    ReadOutcome::Present(state) => state,
                    ReadOutcome::Gone => bail!("{} does not exist", id),
                },
            };
            runner.update(&id, &prior, &desired).await?;
            eprintln!("Updated {}", id);
        }
        Command::Delete { id } => {
            let id = parse_id(&id)?;
            runner.delete(&id).await?;
            eprintln!("Deleted {}", id);
        }
        Command::Schema | Command::Validate { .. } => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!("{:#}", err);
        let api_failure = err
            .chain()
            .any(|cause| cause.downcast_ref::<ApiError>().is_some());
        if api_failure {
            eprintln!("Error: {}", err);
            eprintln!("Hint: {}", format_arm_error(&err));
        } else {
            eprintln!("Error: {:#}", err);
        }
        std::process::exit(1);
    }

    Ok(())
}
