use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use futureproof::config::{CliOverrides, Config};
use futureproof::logging::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "futureproof")]
#[command(
    version,
    about = "Analyze repositories and modernize them with the Futureproof service"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Path to config.toml (defaults to ~/.futureproof/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8000. Overrides config and FUTUREPROOF_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Real-time base URL, e.g. ws://localhost:8000. Overrides config and FUTUREPROOF_WS_URL.
    #[arg(long, global = true)]
    pub ws_url: Option<String>,

    /// Token file (defaults to `token` next to the config file)
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a repository, wait for analysis, review it and transform
    Run {
        /// Repository URL, e.g. https://github.com/acme/widgets
        repo_url: String,

        /// Start the transformation without asking
        #[arg(short, long)]
        yes: bool,

        /// Open the download link in the browser when done
        #[arg(long)]
        open: bool,
    },
    /// List, inspect or delete projects
    Projects {
        #[command(subcommand)]
        command: Option<ProjectsCommands>,
    },
    /// Trigger or inspect code analysis
    Analysis {
        #[command(subcommand)]
        command: AnalysisCommands,
    },
    /// Preview and run transformations
    Transform {
        #[command(subcommand)]
        command: TransformCommands,
    },
    /// Dashboard statistics and recent activity
    Dashboard {
        #[command(subcommand)]
        command: Option<DashboardCommands>,
    },
    /// Stream live events for a project
    Watch {
        project_id: i64,

        /// Send a `ping` frame once connected
        #[arg(long)]
        ping: bool,

        /// Print raw JSON instead of formatted events
        #[arg(long)]
        raw: bool,
    },
    /// Store a bearer token for API requests
    Login {
        /// Token to store. Prompted for (hidden input) when omitted.
        token: Option<String>,
    },
    /// Remove the stored bearer token
    Logout,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Build a WhatsApp link for a contact message
    Contact {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        message: Option<String>,
        /// WhatsApp number to contact. Overrides [contact] whatsapp_number.
        #[arg(long)]
        number: Option<String>,
        /// Open the link in the browser
        #[arg(long)]
        open: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProjectsCommands {
    /// List all projects
    List,
    /// Show one project
    Show { id: i64 },
    /// Delete a project
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum AnalysisCommands {
    /// Start analysis for a project
    Trigger { project_id: i64 },
    /// Show the latest analysis for a project
    Show {
        project_id: i64,
        /// Look up by analysis id instead of project id
        #[arg(long)]
        analysis_id: Option<i64>,
    },
}

#[derive(Subcommand, Clone)]
pub enum TransformCommands {
    /// Show current scores and what a transformation would touch
    Preview { project_id: i64 },
    /// Queue a standard transformation
    Standard { project_id: i64 },
    /// Run a maximum transformation with the configured options
    Maximum {
        project_id: i64,
        /// maximum, quick or conservative
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        target_year: Option<u16>,
        /// Report changes without applying them
        #[arg(long)]
        dry_run: bool,
    },
    /// Transform ML code towards a framework
    Ml {
        project_id: i64,
        /// pytorch, tensorflow or scikit-learn
        #[arg(long, default_value = "pytorch")]
        target: String,
        #[arg(long)]
        quantization: bool,
        #[arg(long)]
        no_mlflow: bool,
    },
    /// Run front-end optimization
    React {
        project_id: i64,
        /// Options as a JSON object
        #[arg(long, default_value = "{}")]
        options: String,
    },
    /// List what the backend can transform
    Capabilities,
    /// Download the transformed archive
    Download {
        project_id: i64,
        /// Output file (defaults to project-<id>-transformed.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
pub enum DashboardCommands {
    /// Project, analysis and transformation counts
    Stats,
    /// Recent activity feed
    Activity,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the real environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format)?;

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        api_url: cli.api_url.clone(),
        ws_url: cli.ws_url.clone(),
        token_path: cli.token_file.clone(),
    };

    // `config init` must work even when the existing file does not parse.
    if let Commands::Config {
        command: Some(ConfigCommands::Init { force }),
    } = &cli.command
    {
        return cmd::cmd_config_init(&overrides, *force);
    }

    let config = Config::load(overrides).context("Failed to load configuration")?;

    match &cli.command {
        Commands::Run { repo_url, yes, open } => {
            cmd::cmd_run(&config, repo_url, *yes, *open).await?;
        }
        Commands::Projects { command } => cmd::cmd_projects(&config, command.clone()).await?,
        Commands::Analysis { command } => cmd::cmd_analysis(&config, command.clone()).await?,
        Commands::Transform { command } => cmd::cmd_transform(&config, command.clone()).await?,
        Commands::Dashboard { command } => cmd::cmd_dashboard(&config, command.clone()).await?,
        Commands::Watch {
            project_id,
            ping,
            raw,
        } => cmd::cmd_watch(&config, *project_id, *ping, *raw).await?,
        Commands::Login { token } => cmd::cmd_login(&config, token.as_deref())?,
        Commands::Logout => cmd::cmd_logout(&config)?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
        Commands::Contact {
            name,
            email,
            message,
            number,
            open,
        } => cmd::cmd_contact(
            &config,
            cmd::ContactArgs {
                name: name.clone(),
                email: email.clone(),
                message: message.clone(),
                number: number.clone(),
                open: *open,
            },
        )?,
    }

    Ok(())
}
