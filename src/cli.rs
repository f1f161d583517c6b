use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "formbridge",
    about = "Forward contact-form submissions to Mailchimp, HubSpot and other integrations",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/formbridge/logs/formbridge.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to formbridge.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the formbridge directory
    Init {
        /// Directory to initialize (defaults to ~/.config/formbridge)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Inspect registered integrations
    Integration {
        #[command(subcommand)]
        action: IntegrationAction,
    },

    /// Manage per-form integration settings
    Form {
        #[command(subcommand)]
        action: FormAction,
    },

    /// Manage global integration settings (credentials)
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Dispatch a form submission to its enabled integrations
    Submit {
        /// Form id (overrides the payload's form_id)
        #[arg(long)]
        form_id: Option<String>,

        /// Submission id (generated when absent from the payload)
        #[arg(long)]
        submission_id: Option<String>,

        /// Submission JSON (read from stdin when omitted)
        payload: Option<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Query and prune the submission log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// Show system status
    Status {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum IntegrationAction {
    /// List registered integrations
    List {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,

        /// Show only integrations with credentials
        #[arg(long)]
        configured: bool,
    },

    /// Show integration details
    Info {
        /// Integration id
        id: String,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Test the connection to the remote service
    Test {
        /// Integration id
        id: String,
    },

    /// Validate settings against the integration's schema
    Validate {
        /// Integration id
        id: String,

        /// Validate the settings resolved for this form
        #[arg(long)]
        form: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FormAction {
    /// Show integration settings for a form
    Show {
        /// Form id (omit to list forms)
        form_id: Option<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Enable an integration for a form
    Enable {
        /// Form id
        form_id: String,

        /// Integration id
        integration: String,

        /// Extra settings as key=value (value parsed as JSON when possible)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Disable an integration for a form
    Disable {
        /// Form id
        form_id: String,

        /// Integration id
        integration: String,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Set a global setting for an integration
    Set {
        /// Integration id
        integration: String,

        /// Setting key
        key: String,

        /// New value (parsed as JSON when possible)
        value: String,
    },

    /// Remove a global setting
    Unset {
        /// Integration id
        integration: String,

        /// Setting key
        key: String,
    },

    /// Show global settings for an integration (secrets masked)
    Show {
        /// Integration id
        integration: String,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Subcommand)]
pub enum LogAction {
    /// List submission log entries
    List {
        /// Filter by form id
        #[arg(long)]
        form: Option<String>,

        /// Filter by submission id
        #[arg(long)]
        submission: Option<String>,

        /// Filter by integration id
        #[arg(long)]
        integration: Option<String>,

        /// Filter by status (success, error)
        #[arg(long)]
        status: Option<String>,

        /// Show only the newest N entries
        #[arg(long, short = 'n')]
        last: Option<usize>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Remove entries older than N days
    Prune {
        /// Age in days
        #[arg(long)]
        days: u32,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (dot notation)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// New value
        value: String,
    },
}
