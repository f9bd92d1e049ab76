use anyhow::Result;
use clap::{Parser, Subcommand};

use emote_dash::cli::{self, OutputFormat};
use emote_dash::config;

#[derive(Debug, Parser)]
#[command(name = "emote-dash")]
#[command(about = "Shareable-URL dashboard for live emote analytics")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Inspect or edit the state carried by a dashboard URL (offline)
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Show the queries a dashboard URL resolves to
    Resolve {
        /// Dashboard URL or query string
        url: String,
        /// Resolve as live / offline instead of asking the upstream
        #[arg(long)]
        live: Option<bool>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show whether the tracked stream is live
    Live {
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Fetch the emote time series for a dashboard URL
    Series {
        url: String,
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Fetch a ranked clip list for a dashboard URL
    Clips {
        url: String,
        /// Which list: max (top) or min (lowest)
        #[arg(long, default_value = "max")]
        slot: String,
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Find the clip nearest a chart timestamp
    ClipAt {
        /// Unix timestamp in (fractional) seconds
        unix_seconds: f64,
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Poll the upstream for a dashboard URL and print updates
    Watch { url: String },
    /// Start the web dashboard
    Serve {
        /// Listen address (default from config: 127.0.0.1:9747)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Show recent navigations
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum StateAction {
    /// Validate and print the state in a URL
    Parse {
        url: String,
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Merge a JSON patch into the state and print the next URL
    Patch { url: String, patch: String },
    /// Add or remove one plotted emote and print the next URL
    Toggle { url: String, emote: String },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.emote-dash/config.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `polling.series_secs 5`
    Set { key: String, value: String },
    /// Reset ~/.emote-dash/config.toml to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let config = config::load();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    let fmt = |format: &str| OutputFormat::from_str_opt(Some(format));

    match app.command {
        Commands::State { action } => match action {
            StateAction::Parse { url, format } => cli::run_state_parse(&config, &url, fmt(&format)),
            StateAction::Patch { url, patch } => cli::run_state_patch(&config, &url, &patch),
            StateAction::Toggle { url, emote } => cli::run_state_toggle(&config, &url, &emote),
        },
        Commands::Resolve { url, live, format } => {
            cli::run_resolve(&config, &url, live, fmt(&format))
        }
        Commands::Live { format } => cli::run_live(&config, fmt(&format)),
        Commands::Series { url, format } => cli::run_series(&config, &url, fmt(&format)),
        Commands::Clips { url, slot, format } => {
            cli::run_clips(&config, &url, &slot, fmt(&format))
        }
        Commands::ClipAt {
            unix_seconds,
            format,
        } => cli::run_clip_at(&config, unix_seconds, fmt(&format)),
        Commands::Watch { url } => cli::run_watch(&config, &url),
        Commands::Serve { addr } => cli::run_serve(&config, addr.as_deref()),
        Commands::History { limit, format } => cli::run_history(limit, fmt(&format)),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
