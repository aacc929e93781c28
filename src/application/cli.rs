use std::env;
use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use owo_colors::OwoColorize;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::services::actions::help_text;
use crate::infrastructure::session_stores::SessionStoreManager;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

pub fn log_dir() -> path::PathBuf {
    if let Ok(dir) = env::var("STRATEGIST_LOG_DIR") {
        return path::PathBuf::from(dir);
    }

    return dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("strategist");
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

async fn print_session() -> Result<()> {
    let store = SessionStoreManager::get(&Config::get(ConfigKey::SessionDir));
    match store.get().await? {
        Some(session_id) => println!("{session_id}"),
        None => println!("There is no stored session. One is created with your next message."),
    }

    return Ok(());
}

async fn clear_session() -> Result<()> {
    SessionStoreManager::get(&Config::get(ConfigKey::SessionDir))
        .clear()
        .await?;
    println!("Cleared the stored session. Your next message starts a new conversation.");

    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for Strategist")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running Strategist with environment variable RUST_LOG=strategist")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn subcommand_session() -> Command {
    return Command::new("session")
        .about("Inspect or reset the conversation session shared with the agent.")
        .arg_required_else_help(true)
        .subcommand(Command::new("path").about("Print the directory the session id is stored in."))
        .subcommand(Command::new("show").about("Print the stored session id."))
        .subcommand(Command::new("clear").about("Forget the stored session id so the next message starts a new conversation."));
}

fn arg_api_url() -> Arg {
    return Arg::new(ConfigKey::ApiURL.to_string())
        .short('u')
        .long(ConfigKey::ApiURL.to_string())
        .env("STRATEGIST_API_URL")
        .num_args(1)
        .help(format!(
            "Base URL of the marketing agent API. [default: {}]",
            Config::default(ConfigKey::ApiURL)
        ));
}

fn arg_client_session_id() -> Arg {
    return Arg::new(ConfigKey::ClientSessionID.to_string())
        .long(ConfigKey::ClientSessionID.to_string())
        .env("STRATEGIST_CLIENT_SESSION_ID")
        .num_args(1)
        .help(format!(
            "Generate the session id locally on the first message. When false, the id issued by the server is adopted. [default: {}]",
            Config::default(ConfigKey::ClientSessionID)
        ))
        .value_parser(PossibleValuesParser::new(["true", "false"]));
}

fn arg_health_check_timeout() -> Arg {
    return Arg::new(ConfigKey::HealthCheckTimeout.to_string())
        .long(ConfigKey::HealthCheckTimeout.to_string())
        .env("STRATEGIST_HEALTH_CHECK_TIMEOUT")
        .num_args(1)
        .help(format!(
            "Time to wait in milliseconds before timing out when checking the agent API is up. [default: {}]",
            Config::default(ConfigKey::HealthCheckTimeout)
        ));
}

fn arg_session_dir() -> Arg {
    return Arg::new(ConfigKey::SessionDir.to_string())
        .long(ConfigKey::SessionDir.to_string())
        .env("STRATEGIST_SESSION_DIR")
        .num_args(1)
        .help(format!(
            "Directory the session id is persisted in. An empty value keeps it in memory only. [default: {}]",
            Config::default(ConfigKey::SessionDir)
        ));
}

fn arg_username() -> Arg {
    return Arg::new(ConfigKey::Username.to_string())
        .long(ConfigKey::Username.to_string())
        .env("STRATEGIST_USERNAME")
        .num_args(1)
        .help(format!(
            "Your name displayed next to your messages. [default: {}]",
            Config::default(ConfigKey::Username)
        ));
}

fn subcommand_chat() -> Command {
    return Command::new("chat")
        .about("Start chatting with Emily, your marketing strategist.")
        .arg(arg_client_session_id())
        .arg(arg_health_check_timeout())
        .arg(arg_username());
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") {
                return format!("CHAT {line}").underline().bold().to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("strategist")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(subcommand_chat())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .subcommand(subcommand_session())
        .arg(arg_client_session_id())
        .arg(arg_health_check_timeout())
        .arg(arg_username())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("STRATEGIST_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(arg_api_url().global(true))
        .arg(arg_session_dir().global(true));
}

/// Handles every subcommand that exits straight away. Returns true when the
/// interactive chat should start.
pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    println!("{}", log_dir().join("debug.log").to_string_lossy());
                }
                Some(("enum-config", _)) => {
                    let res = ConfigKey::VARIANTS.join("\n");
                    println!("{}", res);
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }

            return Ok(false);
        }
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(false);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(false);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(false);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(false);
            }
        },
        Some(("session", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            match subcmd_matches.subcommand() {
                Some(("path", _)) => {
                    println!("{}", Config::get(ConfigKey::SessionDir));
                }
                Some(("show", _)) => {
                    print_session().await?;
                }
                Some(("clear", _)) => {
                    clear_session().await?;
                }
                _ => {
                    subcommand_session().print_long_help()?;
                }
            }

            return Ok(false);
        }
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(true);
}
