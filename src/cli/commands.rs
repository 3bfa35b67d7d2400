use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "relsync",
    about = concat!("relsync v", env!("CARGO_PKG_VERSION"), " - keep the release sheet in step with your issues"),
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different project directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        default_value = "warn",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create relsync.toml and a starter workbook in the current directory
    Init(InitArgs),
    /// Reconcile issue records into the active tab
    Sync(SyncArgs),
    /// Show the active tab's issue index
    Index,
    /// Archive the active tab and start a fresh one from the template
    Rotate(RotateArgs),
    /// List workbook tabs in display order
    Tabs,
    /// Extract issue keys from text (stdin when omitted)
    Keys(KeysArgs),
    /// Read or change relsync.toml values
    Config(ConfigCmd),
    /// Show the recovery log
    Recovery(RecoveryArgs),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Release name written as a comment at the top of relsync.toml
    /// (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Overwrite an existing relsync.toml and workbook
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Sync args
// ---------------------------------------------------------------------------

#[derive(Args)]
#[command(group(
    clap::ArgGroup::new("source")
        .required(true)
        .args(["issue", "text", "records"])
))]
pub struct SyncArgs {
    /// Environment this run reports (dev, qa, stage, production, ...)
    #[arg(long = "env")]
    pub environment: String,
    /// App tag for records that do not carry one
    #[arg(long, default_value = "")]
    pub app: String,
    /// Author for records that do not carry one
    #[arg(long, default_value = "")]
    pub author: String,
    /// Issue key (repeatable)
    #[arg(long, num_args = 1.., action = clap::ArgAction::Append)]
    pub issue: Vec<String>,
    /// File of free text to scan for keys ("-" reads stdin)
    #[arg(long)]
    pub text: Option<String>,
    /// JSON file holding an array of issue records
    #[arg(long)]
    pub records: Option<PathBuf>,
    /// Date used for the archive name (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub date: Option<String>,
    /// Value written into the fresh active tab, overriding rotation.carry_from
    #[arg(long)]
    pub carry: Option<String>,
    /// Do not rotate even when syncing the terminal environment
    #[arg(long)]
    pub no_rotate: bool,
    /// Show the planned writes without touching the workbook
    #[arg(long)]
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// Rotation / inspection args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RotateArgs {
    /// Date used for the archive name (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub date: Option<String>,
    /// Value written into the fresh active tab, overriding rotation.carry_from
    #[arg(long)]
    pub carry: Option<String>,
}

#[derive(Args)]
pub struct KeysArgs {
    /// Text to scan
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a value (section.key)
    Get(ConfigGetArgs),
    /// Set a value (section.key); keys.prefixes takes a comma-separated list
    Set(ConfigSetArgs),
}

#[derive(Args)]
pub struct ConfigGetArgs {
    pub key: String,
}

#[derive(Args)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryArgs {
    /// Show only the last N entries
    #[arg(long)]
    pub tail: Option<usize>,
}
