// ABOUTME: Command-line interface definition and argument parsing
// ABOUTME: Handles login, sms, setup and config commands plus global options

use clap::{Args, Parser, Subcommand};

use crate::config::Platform;
use crate::models::ZoneCode;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Parser)]
#[command(name = "tal-login")]
#[command(about = "Log in to the Ledu / Xueersi Peiyou course platforms")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Platform to log in to
    #[arg(short, long, value_enum, global = true)]
    pub platform: Option<Platform>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with username and password (default command)
    Login(LoginArgs),
    /// Log in with an SMS verification code
    Sms(SmsArgs),
    /// Set up configuration interactively
    Setup(SetupArgs),
    /// Show current configuration
    Config(ConfigArgs),
}

/// Options shared by both login commands
#[derive(Args, Clone, Default)]
pub struct OutputArgs {
    /// Print the result and continue without waiting for the dialog button
    #[arg(long)]
    pub no_dialog: bool,

    /// Print the final outcome as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct LoginArgs {
    /// Phone number or student number (falls back to TAL_USERNAME, then a prompt)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password (falls back to TAL_PASSWORD, then a hidden prompt)
    #[arg(long)]
    pub password: Option<String>,

    /// How many times to ask again after a failed interactive login
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl Default for LoginArgs {
    fn default() -> Self {
        LoginArgs {
            username: None,
            password: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            output: OutputArgs::default(),
        }
    }
}

#[derive(Args, Clone)]
pub struct SmsArgs {
    /// Phone number (prompted when omitted)
    #[arg(long)]
    pub phone: Option<String>,

    /// Calling code: 86, 886, 853 or 852 (prompted when omitted)
    #[arg(long)]
    pub zone: Option<ZoneCode>,

    /// Code already received; skips sending a new one
    #[arg(long)]
    pub code: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct SetupArgs {
    /// Force setup even if config file exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Show configuration file path
    #[arg(long)]
    pub path: bool,
}
