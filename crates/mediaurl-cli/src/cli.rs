use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "mediaurl")]
#[command(about = "Resolve storage references into time-limited signed URLs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML config file (defaults to ./mediaurl.toml if present)
    #[arg(short, long, global = true, env = "MEDIAURL_CONFIG")]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Log at debug level (overrides logging.level)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve references one at a time
    Resolve(ResolveArgs),
    /// Resolve references as a single batch
    Batch(BatchArgs),
    /// Sign a download URL with an attachment filename (never cached)
    Attachment(AttachmentArgs),
    /// Check cache tier availability
    Check,
    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct ResolveArgs {
    /// References (e.g. store://bucket/key.jpg)
    #[arg(required = true)]
    pub references: Vec<String>,
}

#[derive(clap::Args)]
pub struct BatchArgs {
    /// References (e.g. store://bucket/key.jpg)
    pub references: Vec<String>,
    /// Read additional references from a file, one per line ("-" for stdin)
    #[arg(long)]
    pub file: Option<String>,
    /// Report failures per reference instead of failing the whole batch
    #[arg(long)]
    pub settled: bool,
}

#[derive(clap::Args)]
pub struct AttachmentArgs {
    /// Reference to sign
    pub reference: String,
    /// Filename offered to the browser
    pub filename: String,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show effective config (secrets redacted)
    Show,
}
