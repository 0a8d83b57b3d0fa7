use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use scm_client::config::Config;
use scm_client::models::{Container, RawResource};
use scm_client::resource::{get_all_resource_keys, get_resource, ListOptions, ResourceService};
use scm_client::{format_error, ScmClient, ScmError, VERSION};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command line client for the Strata Cloud Manager configuration API
#[derive(Parser, Debug)]
#[command(name = "scm", version = VERSION, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: <config dir>/scm/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every object of a resource type in a container
    List {
        resource: String,
        #[command(flatten)]
        container: ContainerArgs,
        /// Page size (clamped to the resource's ceiling)
        #[arg(long)]
        limit: Option<i64>,
        /// Only objects defined directly in the container, not inherited ones
        #[arg(long)]
        exact_match: bool,
        #[arg(long = "exclude-folder")]
        exclude_folders: Vec<String>,
        #[arg(long = "exclude-snippet")]
        exclude_snippets: Vec<String>,
        #[arg(long = "exclude-device")]
        exclude_devices: Vec<String>,
        /// Server-side filter, repeatable: --filter name=web
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, String)>,
    },
    /// Get one object by id
    Get { resource: String, id: String },
    /// Find one object by name in exactly this container
    Fetch {
        resource: String,
        name: String,
        #[command(flatten)]
        container: ContainerArgs,
    },
    /// Create an object from a JSON or YAML file
    Create {
        resource: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Replace an object from a JSON or YAML file (must contain "id")
    Update {
        resource: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete an object by id
    Delete {
        resource: String,
        id: String,
        /// Succeed if the object does not exist
        #[arg(long)]
        missing_ok: bool,
    },
    /// Acquire a token and print its expiry
    Token,
    /// List known resource types
    Resources,
}

#[derive(ClapArgs, Debug)]
struct ContainerArgs {
    #[arg(long, group = "container")]
    folder: Option<String>,
    #[arg(long, group = "container")]
    snippet: Option<String>,
    #[arg(long, group = "container")]
    device: Option<String>,
}

impl ContainerArgs {
    fn container(&self) -> Result<Container> {
        match (&self.folder, &self.snippet, &self.device) {
            (Some(name), None, None) => Ok(Container::Folder(name.clone())),
            (None, Some(name), None) => Ok(Container::Snippet(name.clone())),
            (None, None, Some(name)) => Ok(Container::Device(name.clone())),
            _ => bail!("exactly one of --folder, --snippet or --device is required"),
        }
    }
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

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(tracing_level).into())
                .from_env_lossy(),
        )
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("scm {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("scm").join("scm.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".scm").join("scm.log");
    }
    PathBuf::from("scm.log")
}

/// Untyped service for a registered resource, validated with its typed
/// schema's rules where one exists
fn service(client: &ScmClient, key: &str) -> Result<ResourceService<RawResource>> {
    if get_resource(key).is_none() {
        bail!(
            "Unknown resource '{}'. Known resources: {}",
            key,
            get_all_resource_keys().join(", ")
        );
    }
    client.raw_resource(key).map_err(api_error)
}

/// Read a JSON or YAML payload; YAML is chosen by extension
fn read_payload(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Log an API failure and attach the short user-facing message
fn api_error(e: ScmError) -> anyhow::Error {
    tracing::error!("{}", e);
    let message = format_error(&e);
    anyhow::Error::new(e).context(message)
}

async fn run(args: Args) -> Result<()> {
    if let Command::Resources = args.command {
        for key in get_all_resource_keys() {
            if let Some(descriptor) = get_resource(key) {
                println!("{:<32} {}", key, descriptor.display_name);
            }
        }
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;
    let client = config.build_client()?;

    match args.command {
        Command::List {
            resource,
            container,
            limit,
            exact_match,
            exclude_folders,
            exclude_snippets,
            exclude_devices,
            filters,
        } => {
            let service = service(&client, &resource)?;
            let container = container.container()?;
            let options = ListOptions {
                max_limit: limit,
                filters,
                exact_match,
                exclude_folders,
                exclude_snippets,
                exclude_devices,
            };
            let items = service.list(&container, &options).await.map_err(api_error)?;
            tracing::info!("Listed {} {} in {}", items.len(), resource, container);
            print_json(&items)?;
        }
        Command::Get { resource, id } => {
            let service = service(&client, &resource)?;
            print_json(&service.get(&id).await.map_err(api_error)?)?;
        }
        Command::Fetch {
            resource,
            name,
            container,
        } => {
            let service = service(&client, &resource)?;
            let container = container.container()?;
            match service.fetch(&name, &container).await.map_err(api_error)? {
                Some(item) => print_json(&item)?,
                None => bail!("No {} named '{}' in {}", resource, name, container),
            }
        }
        Command::Create { resource, file } => {
            let service = service(&client, &resource)?;
            let payload = read_payload(&file)?;
            print_json(&service.create(&payload).await.map_err(api_error)?)?;
        }
        Command::Update { resource, file } => {
            let service = service(&client, &resource)?;
            let payload = read_payload(&file)?;
            print_json(&service.update(&payload).await.map_err(api_error)?)?;
        }
        Command::Delete {
            resource,
            id,
            missing_ok,
        } => {
            let service = service(&client, &resource)?;
            if missing_ok {
                if !service.delete_if_present(&id).await.map_err(api_error)? {
                    eprintln!("{} {} was already absent", resource, id);
                }
            } else {
                service.delete(&id).await.map_err(api_error)?;
            }
        }
        Command::Token => {
            client.tokens().get_token().await.map_err(api_error)?;
            match client.tokens().token_expires_at().await {
                Some(expires_at) => println!("token valid until {}", expires_at.to_rfc3339()),
                None => println!("static access token (no expiry tracked)"),
            }
        }
        Command::Resources => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    run(args).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scm_client::scm::http::{HttpRequest, HttpResponse, Transport, TransportError};
    use scm_client::validation::ValidationError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: 200,
                body: "{}".to_string(),
            })
        }
    }

    fn client(transport: Arc<CountingTransport>) -> ScmClient {
        ScmClient::builder()
            .static_token("test-token")
            .base_url("https://api.test")
            .transport(transport)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_illegal_protocol_pair_locally() {
        let transport = Arc::new(CountingTransport::default());
        let service = service(&client(transport.clone()), "route-redistribution-profiles").unwrap();

        let err = service
            .create(&json!({
                "name": "bad",
                "folder": "Texas",
                "protocol": {"bgp_to_ospf": {"redistribute_static": {}}}
            }))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScmError::InvalidObject(ValidationError::IllegalCombination { .. })
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_two_address_types_locally() {
        let transport = Arc::new(CountingTransport::default());
        let service = service(&client(transport.clone()), "addresses").unwrap();

        let err = service
            .create(&json!({
                "name": "web",
                "folder": "Texas",
                "ip_netmask": "10.0.0.1/32",
                "fqdn": "web.example.com"
            }))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScmError::InvalidObject(ValidationError::Exclusive { .. })
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_resource_lists_known_keys() {
        let transport = Arc::new(CountingTransport::default());
        let err = service(&client(transport), "no-such-thing").err().unwrap();
        assert!(err.to_string().contains("addresses"));
    }
}
