//! Clap derive structures for the `qsync` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// qsync -- select, watch and drive controls on a remote core
#[derive(Debug, Parser)]
#[command(
    name = "qsync",
    version,
    about = "Select, watch and drive named controls on a remote core",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Core profile to use
    #[arg(long, short = 'p', env = "QSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Core WebSocket URL (overrides profile)
    #[arg(long, short = 'c', env = "QSYNC_CORE", global = true)]
    pub core: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "QSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "QSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the core's component directory
    #[command(alias = "comp")]
    Components(ComponentsArgs),

    /// Resolve a configured view
    View(ViewArgs),

    /// Resolve a single ad-hoc selection
    #[command(alias = "sel")]
    Select(SelectArgs),

    /// Write a control's value or position
    Set(SetArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Per-command arguments ────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ComponentsArgs {
    /// Only list components of this type
    #[arg(long = "type", short = 't')]
    pub component_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    /// View name from the config file
    pub name: String,

    /// Keep running and print entities as they change
    #[arg(long, short = 'w')]
    pub watch: bool,
}

#[derive(Debug, Args)]
#[command(group(
    clap::ArgGroup::new("directive")
        .required(true)
        .args(["component_pattern", "control_type", "component_type"])
))]
pub struct SelectArgs {
    /// Regex matched against component names (case-insensitive)
    #[arg(long)]
    pub component_pattern: Option<String>,

    /// Regex matched against control names within the matched components
    #[arg(long, requires = "component_pattern")]
    pub control_pattern: Option<String>,

    /// Select every control of this type across all components
    #[arg(long)]
    pub control_type: Option<String>,

    /// Select every control of components of this type
    #[arg(long)]
    pub component_type: Option<String>,
}

#[derive(Debug, Args)]
#[command(group(
    clap::ArgGroup::new("target")
        .required(true)
        .args(["value", "position"])
))]
pub struct SetArgs {
    /// Component name
    pub component: String,

    /// Control name
    pub control: String,

    /// New value
    #[arg(long, allow_negative_numbers = true)]
    pub value: Option<f64>,

    /// New position (0.0 - 1.0)
    #[arg(long)]
    pub position: Option<f64>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
