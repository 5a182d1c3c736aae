use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use nas_scanner_lib::backend::{Backend, HttpBackend};
use nas_scanner_lib::config::{self, AppConfig};
use nas_scanner_lib::coordinator::{
    ConfigurationCoordinator, GreetCoordinator, QueryCoordinator, SettingsCoordinator,
};
use nas_scanner_lib::query::{Combinator, Scope};
use nas_scanner_lib::state::ConnectionStatus;
use nas_scanner_lib::storage::FileStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "nas-scanner")]
#[command(about = "Search the NAS file index and manage its connection settings")]
struct Cli {
    /// Search service base URL (overrides config.json).
    #[arg(long, env = "NAS_SCANNER_ENDPOINT", global = true)]
    endpoint: Option<String>,
    /// Debug logging for nas-scanner itself.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Round-trip a greeting through the search service.
    Greet { name: String },
    /// Search indexed files. Terms may be separated by spaces or commas.
    Search {
        #[arg(required = true, value_name = "TERMS")]
        terms: Vec<String>,
        /// Match any term instead of all of them.
        #[arg(long)]
        any: bool,
        /// Match against directory paths instead of file names.
        #[arg(long)]
        directories: bool,
        /// Reveal the directory of the N-th result (1-based) afterwards.
        #[arg(long, value_name = "N")]
        open: Option<usize>,
    },
    /// Reveal a directory in the file manager on the service host.
    Open { directory: String },
    /// Probe the saved database connection.
    TestConnection,
    /// Show or change the saved database connection.
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Server-side key/value configuration.
    Configs {
        #[command(subcommand)]
        action: ConfigsCommand,
    },
    /// Print where config and settings are stored.
    DataDir,
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    /// Update fields, save, and probe the result.
    Set {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        database: Option<String>,
    },
    /// Restore the default connection.
    Reset,
}

#[derive(Subcommand)]
enum ConfigsCommand {
    List,
    Get { key: String },
    Set { key: String, value: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    nas_scanner_lib::init_logging(cli.verbose);

    // ── Config ──
    let data_dir = config::app_data_dir();
    std::fs::create_dir_all(&data_dir).ok();
    let mut app_config = config::load_config(&data_dir.join("config.json"));
    if let Some(endpoint) = cli.endpoint.clone() {
        app_config.backend_endpoint = endpoint;
    }

    // ── Tokio runtime ──
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(cli.command, app_config, data_dir))
}

async fn run(command: Commands, app_config: AppConfig, data_dir: std::path::PathBuf) -> ExitCode {
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::from_config(&app_config));
    let settings = SettingsCoordinator::new(
        backend.clone(),
        Arc::new(FileStore::in_dir(&data_dir)),
        Duration::from_millis(app_config.save_delay_ms),
    );

    match command {
        Commands::DataDir => {
            println!("{}", data_dir.display());
            ExitCode::SUCCESS
        }
        Commands::Greet { name } => {
            let greet = GreetCoordinator::new(backend);
            greet.set_name(name);
            greet.submit().await;
            let state = greet.snapshot();
            if !state.error.is_empty() {
                eprintln!("Error: {}", state.error);
                return ExitCode::FAILURE;
            }
            println!("{}", state.greeting);
            ExitCode::SUCCESS
        }
        Commands::Search {
            terms,
            any,
            directories,
            open,
        } => {
            let search = QueryCoordinator::new(backend);
            search.set_raw_input(terms.join(" "));
            search.set_combinator(if any { Combinator::Or } else { Combinator::And });
            search.set_scope(if directories { Scope::Directory } else { Scope::Filename });
            if !search.snapshot().has_search_terms() {
                eprintln!("Nothing to search for.");
                return ExitCode::FAILURE;
            }

            search.search(&settings.config()).await;
            let state = search.snapshot();
            if !state.error.is_empty() {
                eprintln!("Error: {}", state.error);
                return ExitCode::FAILURE;
            }
            for r in &state.results {
                let modified = r.last_modified.as_deref().unwrap_or("-");
                println!("{:<19}  {}/{}", modified, r.directory.trim_end_matches('/'), r.filename);
            }
            println!("{} result(s)", state.results.len());

            if let Some(n) = open {
                if n == 0 || !search.open_result_directory(n - 1).await {
                    eprintln!("No result #{}", n);
                    return ExitCode::FAILURE;
                }
                let error = search.snapshot().error;
                if !error.is_empty() {
                    eprintln!("Error: {}", error);
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Commands::Open { directory } => {
            let search = QueryCoordinator::new(backend);
            search.open_directory(&directory).await;
            let error = search.snapshot().error;
            if !error.is_empty() {
                eprintln!("Error: {}", error);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Commands::TestConnection => {
            let connected = settings.test_connection().await;
            println!("{}", settings.connection_status().label());
            if connected {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Settings { action } => run_settings(action, &settings).await,
        Commands::Configs { action } => {
            let configs = ConfigurationCoordinator::new(backend);
            run_configs(action, &configs, &settings).await
        }
    }
}

async fn run_settings(action: SettingsCommand, settings: &SettingsCoordinator) -> ExitCode {
    match action {
        SettingsCommand::Show => {
            let c = settings.config();
            println!("host      {}", c.host);
            println!("port      {}", c.port);
            println!("user      {}", c.user);
            println!("password  {}", if c.password.is_empty() { "" } else { "********" });
            println!("database  {}", c.database);
            ExitCode::SUCCESS
        }
        SettingsCommand::Set {
            host,
            port,
            user,
            password,
            database,
        } => {
            settings.open();
            settings.edit_config(|c| {
                if let Some(v) = host {
                    c.host = v;
                }
                if let Some(v) = port {
                    c.port = v;
                }
                if let Some(v) = user {
                    c.user = v;
                }
                if let Some(v) = password {
                    c.password = v;
                }
                if let Some(v) = database {
                    c.database = v;
                }
            });
            settings.save().await;
            let state = settings.snapshot();
            if !state.error.is_empty() {
                eprintln!("Error: {}", state.error);
                return ExitCode::FAILURE;
            }
            println!("Saved. Connection {}", state.connection_status.label());
            if state.connection_status == ConnectionStatus::Connected {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        SettingsCommand::Reset => {
            settings.reset();
            let state = settings.snapshot();
            if !state.error.is_empty() {
                eprintln!("Error: {}", state.error);
                return ExitCode::FAILURE;
            }
            println!("Connection settings restored to defaults.");
            ExitCode::SUCCESS
        }
    }
}

async fn run_configs(
    action: ConfigsCommand,
    configs: &ConfigurationCoordinator,
    settings: &SettingsCoordinator,
) -> ExitCode {
    let db_config = settings.config();
    match &action {
        ConfigsCommand::Set { key, value } => configs.update(&db_config, key, value).await,
        ConfigsCommand::List | ConfigsCommand::Get { .. } => configs.load(&db_config).await,
    }

    let state = configs.snapshot();
    if !state.error.is_empty() {
        eprintln!("Error: {}", state.error);
        return ExitCode::FAILURE;
    }

    match action {
        ConfigsCommand::List => {
            for e in &state.entries {
                match &e.description {
                    Some(d) if !d.is_empty() => println!("{} = {}  # {}", e.key, e.value, d),
                    _ => println!("{} = {}", e.key, e.value),
                }
            }
        }
        ConfigsCommand::Get { key } => {
            if state.entry(&key).is_none() {
                eprintln!("No configuration named '{}'", key);
                return ExitCode::FAILURE;
            }
            println!("{}", state.value_of(&key));
        }
        ConfigsCommand::Set { key, .. } => {
            println!("{} = {}", key, state.value_of(&key));
        }
    }
    ExitCode::SUCCESS
}
