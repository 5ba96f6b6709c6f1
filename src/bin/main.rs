// ABOUTME: Main executable for tal-login
// ABOUTME: Collects credentials, runs the login flow with its dialog and prints the session

use std::process;

use colored::*;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use log::{debug, error, info, warn};
use tal_login::{
    auth::Authenticator,
    cli::{Cli, Commands, ConfigArgs, LoginArgs, OutputArgs, SetupArgs, SmsArgs},
    config::{env_credentials, Config, Platform},
    dialog::{DialogBackend, HeadlessBackend, TerminalBackend},
    error::{generic_error, AppError},
    flow::LoginFlow,
    models::{LoginOutcome, ZoneCode},
};

use clap::Parser;

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Set log level based on verbose flag, before the logger reads it
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    tal_login::init();

    // Run the application
    if let Err(e) = run(cli) {
        error!("Application error: {}", e);
        eprintln!();
        eprintln!("{} {}", "❌".red(), "Error:".bright_red().bold());
        eprintln!("{}", e.to_string().red());
        eprintln!();
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Some(Commands::Login(args)) => handle_login(cli.platform, args),
        Some(Commands::Sms(args)) => handle_sms(cli.platform, args),
        Some(Commands::Setup(args)) => handle_setup(args),
        Some(Commands::Config(args)) => handle_config(cli.platform, args),
        None => handle_login(cli.platform, LoginArgs::default()),
    }
}

fn handle_login(platform: Option<Platform>, args: LoginArgs) -> Result<(), AppError> {
    let config = Config::load(platform)?;
    let mut flow = build_flow(&config, &args.output)?;

    let (env_username, env_password) = env_credentials();
    let mut username = args.username.or(env_username);
    let mut password = args.password.or(env_password);
    let interactive = username.is_none() || password.is_none();

    let theme = ColorfulTheme::default();
    for attempt in 1..=args.max_attempts {
        debug!("Login attempt {} of {}", attempt, args.max_attempts);

        let user = match username.take() {
            Some(user) => user,
            None => Input::<String>::with_theme(&theme)
                .with_prompt("Username (phone or student number)")
                .interact_text()?,
        };
        let pass = match password.take() {
            Some(pass) => pass,
            None => rpassword::prompt_password(format!("{} Password: ", "🔑".blue()))?,
        };

        let outcome = flow.login(&user, &pass);
        if outcome.is_success() {
            return report_success(&outcome, args.output.json);
        }

        if !interactive {
            break;
        }
        if attempt < args.max_attempts {
            info!("Retrying login ({} attempts left)", args.max_attempts - attempt);
            // Keep the username as the default for the next prompt
            username = Some(
                Input::<String>::with_theme(&theme)
                    .with_prompt("Username (phone or student number)")
                    .default(user)
                    .interact_text()?,
            );
        }
    }

    Err(generic_error("Login failed"))
}

fn handle_sms(platform: Option<Platform>, args: SmsArgs) -> Result<(), AppError> {
    let config = Config::load(platform)?;
    let mut flow = build_flow(&config, &args.output)?;
    let theme = ColorfulTheme::default();

    let zone = match args.zone {
        Some(zone) => zone,
        None => {
            let labels: Vec<&str> = ZoneCode::ALL.iter().map(|z| z.label()).collect();
            let selected = Select::with_theme(&theme)
                .with_prompt("Zone")
                .items(&labels)
                .default(0)
                .interact()?;
            ZoneCode::ALL[selected]
        }
    };

    let phone = match args.phone {
        Some(phone) => phone,
        None => Input::<String>::with_theme(&theme)
            .with_prompt("Phone number")
            .interact_text()?,
    };

    let code = match args.code {
        Some(code) => code,
        None => {
            flow.send_sms_code(&phone, zone)?;
            println!(
                "{} {} {}",
                "📨".blue(),
                "Code sent to".bright_blue(),
                format!("+{} {}", zone.code(), phone).bright_white()
            );
            Input::<String>::with_theme(&theme)
                .with_prompt("SMS code")
                .interact_text()?
        }
    };

    let outcome = flow.login_with_sms(&phone, &code, zone);
    if outcome.is_success() {
        report_success(&outcome, args.output.json)
    } else {
        Err(generic_error("SMS login failed"))
    }
}

fn build_flow(
    config: &Config,
    output: &OutputArgs,
) -> Result<LoginFlow<Box<dyn DialogBackend>>, AppError> {
    let backend: Box<dyn DialogBackend> = if output.no_dialog {
        Box::new(HeadlessBackend::new())
    } else {
        let terminal = TerminalBackend::new();
        if !terminal.is_available() {
            warn!("No interactive terminal for the login dialog, pass --no-dialog to skip it");
        }
        Box::new(terminal)
    };

    let authenticator = Authenticator::from_config(config.clone())?;
    let title = format!("{} 登录", config.platform.display_name());
    Ok(LoginFlow::new(authenticator, backend)
        .with_title(title)
        .with_spinner(true))
}

fn report_success(outcome: &LoginOutcome, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    println!();
    println!("{} {}", "🎉".green(), "Logged in".bright_green().bold());
    match outcome.session() {
        Some(session) => {
            println!(
                "{} {}",
                "User ID:".bright_blue(),
                session.user_id.bright_white()
            );
            println!(
                "{} {}",
                "Token:".bright_blue(),
                session.masked_token().bright_white()
            );
        }
        None => {
            let fields = outcome
                .data()
                .and_then(|data| data.as_object())
                .map_or(0, |object| object.len());
            println!(
                "{} {}",
                "Session data:".bright_blue(),
                format!("{} fields (use --json to print them)", fields).dimmed()
            );
        }
    }
    Ok(())
}

fn handle_setup(args: SetupArgs) -> Result<(), AppError> {
    println!();
    println!("{}", "🛠️  tal-login Setup".bright_cyan().bold());
    println!("{}", "─".repeat(50).dimmed());

    let config_path = Config::get_config_file_path()?;
    if config_path.exists() && !args.force {
        println!();
        println!(
            "{} {}",
            "ℹ️".blue(),
            "Configuration already exists!".yellow()
        );
        println!(
            "{} {} {}",
            "📄".blue(),
            "Location:".bright_blue(),
            config_path.display().to_string().bright_white()
        );
        println!();
        println!(
            "{}",
            "Use --force to overwrite existing configuration".dimmed()
        );
        return Ok(());
    }

    let config = Config::interactive_setup(&config_path)?;

    println!();
    println!("{}", "─".repeat(50).dimmed());
    println!(
        "{} {} {}",
        "🎉".green(),
        "Setup Complete!".bright_green().bold(),
        config.platform.display_name().bright_white()
    );
    println!();
    println!("You can now log in with:");
    println!("  {}", "tal-login".cyan());
    println!("{}", "─".repeat(50).dimmed());

    Ok(())
}

fn handle_config(platform: Option<Platform>, args: ConfigArgs) -> Result<(), AppError> {
    if args.path {
        let path = Config::get_config_file_path()?;
        println!("{}", path.display());
        return Ok(());
    }

    println!();
    println!("{}", "📋 Current Configuration".bright_cyan().bold());
    println!("{}", "─".repeat(50).dimmed());

    let config = Config::load(platform)?;
    println!(
        "{} {}",
        "Platform:".bright_blue(),
        config.platform.display_name().bright_white()
    );
    println!(
        "{} {}",
        "Passport API:".bright_blue(),
        config.passport_base.bright_white()
    );
    println!(
        "{} {}",
        "Course API:".bright_blue(),
        config.course_base.bright_white()
    );
    println!(
        "{} {}",
        "Client ID:".bright_blue(),
        config.client_id.bright_white()
    );
    println!(
        "{} {}",
        "Device ID:".bright_blue(),
        config.device_id.bright_white()
    );
    println!(
        "{} {}",
        "Timeout:".bright_blue(),
        format!("{}s", config.timeout_secs).bright_white()
    );

    if let Ok(config_path) = Config::get_config_file_path() {
        let state = if config_path.exists() {
            ""
        } else {
            " (not created)"
        };
        println!();
        println!(
            "{} {}{}",
            "Config file:".bright_blue(),
            config_path.display().to_string().bright_white(),
            state.dimmed()
        );
    }

    println!("{}", "─".repeat(50).dimmed());
    Ok(())
}
