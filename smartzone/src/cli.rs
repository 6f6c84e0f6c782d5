use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, ValueEnum};
use smartzone::model::Vsan;

#[derive(Parser, Debug)]
#[command(name = "smartzone")]
#[command(about = "Generate and validate smart zoning on MDS SAN directors")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Print the configuration commands for an intent file.
    Generate(GenerateArgs),
    /// Validate an intent file against a switch.
    Check(CheckArgs),
    /// Show zoning entities found in a configuration dump.
    Inspect(InspectArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct IntentArgs {
    /// Intent file listing hosts, pwwns and zones.
    #[arg(short, long)]
    pub intent: PathBuf,
    /// Fabric side whose pwwns are used (key under [host.pwwn]).
    #[arg(short, long)]
    pub fabric: String,
    #[arg(long)]
    pub zoneset: String,
    #[arg(long)]
    pub vsan: Vsan,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub intent: IntentArgs,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub intent: IntentArgs,
    /// Switch host name or address.
    #[arg(short, long, conflicts_with = "replay", required_unless_present = "replay")]
    pub switch: Option<String>,
    /// Answer commands from a recorded transcript instead of a switch.
    #[arg(long)]
    pub replay: Option<PathBuf>,
    /// Login user. Alternate: MDS_USERNAME, then the current OS user.
    #[arg(short, long)]
    pub username: Option<String>,
    /// Login password. Alternate: MDS_PASSWORD. Without either, key login is used.
    #[arg(short, long, conflicts_with = "use_keys")]
    pub password: Option<String>,
    /// Log in with a private key even when MDS_PASSWORD is set.
    #[arg(long)]
    pub use_keys: bool,
    /// Private key for key login. Default: ~/.ssh/id_ed25519, id_ecdsa or id_rsa.
    #[arg(long)]
    pub key_file: Option<PathBuf>,
    #[arg(long)]
    pub port: Option<u16>,
    /// Optional settings TOML file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Configuration dump (show running-config or show zoneset output).
    pub file: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Print the parsed line tree instead of entities.
    #[arg(long)]
    pub tree: bool,
    #[arg(long, default_value_t = 3)]
    pub depth: usize,
}
