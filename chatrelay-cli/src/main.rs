//! CLI entry point for chatrelay

use anyhow::Result;
use chatrelay_broker::{BrokerPtr, KvStorePtr, MemoryBroker, MemoryStore};
use chatrelay_client::identity::format_fields;
use chatrelay_client::{ChatClient, UserProfile};
use chatrelay_core::config::ConfigLoader;
use chatrelay_core::logging::init_logging;
use chatrelay_core::Error;
use clap::{Parser, Subcommand};
use console::style;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "A multi-channel pub/sub chat client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive chat client (default)
    Chat,
    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(&config_loader).await?,
        Commands::Status => run_status(&config_loader)?,
    }

    Ok(())
}

fn run_status(config_loader: &ConfigLoader) -> Result<()> {
    let config = config_loader.load()?;

    println!("Config directory: {}", config_loader.config_dir().display());
    println!("Broker:           {}:{}", config.broker.host, config.broker.port);
    println!("Poll interval:    {}ms", config.client.poll_interval_ms);
    println!("Input poll:       {}ms", config.client.input_poll_ms);
    println!("Queue capacity:   {}", config.client.queue_capacity);
    println!("Re-identify:      {:?}", config.client.reidentify);
    Ok(())
}

const WELCOME: &str = r#"
   ___ _         _            _
  / __| |_  __ _| |_ _ _ ___ | | __ _ _  _
 | (__| ' \/ _` |  _| '_/ -_)| |/ _` | || |
  \___|_||_\__,_|\__|_| \___||_|\__,_|\_, |
                                      |__/

Welcome to chatrelay!

Here are the commands you can use:
!help: List of commands
!weather <city>: Weather update
!fact: Random fact
!add_fact <fact>: Add a fact you find interesting
!whoami: Your user information
!users: List all users
!delete_profile: Delete your user profile
!list_my_channels: List all channels you are subscribed to
!list_all_channels: List all channels available

Options:
1: Identify yourself
2: Join a channel
3: Leave a channel
4: Send a message to a channel
5: Get info about a user
6: Send a private message
7: Exit

Go forth and chat!

If you ever lose your way, type !help to see this message again.
"#;

/// Whether the interactive loop should keep running
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

async fn run_chat(config_loader: &ConfigLoader) -> Result<()> {
    let config = config_loader.load()?;
    let _guard = init_logging(&config.logging);
    info!("Starting interactive chat client");

    let hub = MemoryBroker::new();
    let broker: BrokerPtr = Arc::new(hub.connect().await);
    let store: KvStorePtr = Arc::new(MemoryStore::new());

    let client = ChatClient::new(broker, store, config.client.clone());
    let mut receiver = client
        .take_receiver()
        .await
        .ok_or_else(|| anyhow::anyhow!("delivery receiver already taken"))?;

    println!("{}", WELCOME);

    // Single reader task owns stdin; prompts route through the same
    // channel so there is exactly one consumer of input lines.
    let (line_tx, mut lines) = mpsc::channel::<String>(16);
    tokio::spawn(async move {
        let mut reader = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            if line_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let input_poll = Duration::from_millis(config.client.input_poll_ms);

    loop {
        let mut flow = Flow::Continue;

        tokio::select! {
            maybe_line = lines.recv() => match maybe_line {
                Some(line) => flow = dispatch(&client, &mut lines, line.trim()).await,
                None => flow = Flow::Exit,
            },
            _ = tokio::time::sleep(input_poll) => {}
        }

        // Everything queued at this point is printed before the next
        // input poll, in arrival order.
        for item in receiver.drain() {
            println!("{}", item);
        }

        if flow == Flow::Exit {
            break;
        }
    }

    client.shutdown().await.ok();
    println!("Goodbye!");
    Ok(())
}

/// Print a prompt and wait for the next input line
async fn prompt(lines: &mut mpsc::Receiver<String>, message: &str) -> Option<String> {
    print!("{}", message);
    std::io::stdout().flush().ok();
    lines.recv().await.map(|line| line.trim().to_string())
}

async fn dispatch(
    client: &ChatClient,
    lines: &mut mpsc::Receiver<String>,
    line: &str,
) -> Flow {
    if line.is_empty() {
        return Flow::Continue;
    }

    let result = if line.starts_with('!') {
        handle_special_command(client, lines, line).await
    } else {
        match line {
            "1" => handle_identify(client, lines).await,
            "2" => handle_join(client, lines).await,
            "3" => handle_leave(client, lines).await,
            "4" => handle_send_message(client, lines).await,
            "5" => handle_user_info(client, lines).await,
            "6" => handle_send_private(client, lines).await,
            "7" => return Flow::Exit,
            _ => {
                println!("Invalid choice. Please try again.");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        report_error(&e);
    }
    Flow::Continue
}

fn report_error(error: &Error) {
    if error.is_user_error() {
        println!("{}", style(error).yellow());
    } else {
        println!("{}", style(error).red());
    }
}

async fn handle_special_command(
    client: &ChatClient,
    lines: &mut mpsc::Receiver<String>,
    line: &str,
) -> chatrelay_core::Result<()> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let rest = parts.collect::<Vec<_>>().join(" ");

    match command {
        "!help" => {
            println!("{}", WELCOME);
            Ok(())
        }
        "!weather" => {
            match client.weather(&rest).await? {
                Some(report) => println!("\nThe weather in {} is {}\n", title_case(&rest), report),
                None => println!("\nNo weather information available for {}\n", title_case(&rest)),
            }
            Ok(())
        }
        "!fact" => {
            match client.random_fact().await? {
                Some(fact) => println!("\nDid you know? {}\n", fact),
                None => println!("No facts available at the moment."),
            }
            Ok(())
        }
        "!add_fact" => {
            client.add_fact(&rest).await?;
            println!("\nFact added successfully! Other users can now learn from your wisdom.\n");
            Ok(())
        }
        "!whoami" => {
            let fields = client.whoami().await?;
            if fields.is_empty() {
                println!("No information found for your user.\n");
            } else {
                println!("Your user information:\n");
                for line in format_fields(&fields, false) {
                    println!("{}", line);
                }
                println!();
            }
            Ok(())
        }
        "!users" => handle_list_users(client).await,
        "!delete_profile" => handle_delete_profile(client, lines).await,
        "!list_my_channels" => {
            let channels = client.list_my_channels().await?;
            if channels.is_empty() {
                println!("You haven't joined any channels yet.");
            } else {
                println!("\nList of channels you've joined:");
                for channel in sorted(channels) {
                    println!("- {}", channel);
                }
                println!();
            }
            Ok(())
        }
        "!list_all_channels" => {
            let channels = client.list_all_channels().await?;
            if channels.is_empty() {
                println!("No channels found.");
            } else {
                println!("\nList of all channels:");
                for channel in sorted(channels) {
                    println!("- {}", channel);
                }
                println!();
            }
            Ok(())
        }
        other => Err(Error::UnknownCommand(other.to_string())),
    }
}

async fn handle_identify(
    client: &ChatClient,
    lines: &mut mpsc::Receiver<String>,
) -> chatrelay_core::Result<()> {
    let Some(username) = prompt(lines, "Enter your username: ").await else {
        return Ok(());
    };
    let Some(age) = prompt(lines, "Enter your age: ").await else {
        return Ok(());
    };
    let Some(gender) = prompt(lines, "Enter your gender: ").await else {
        return Ok(());
    };
    let Some(location) = prompt(lines, "Enter your location: ").await else {
        return Ok(());
    };

    client
        .identify(&username, UserProfile::new(age, gender, location))
        .await?;

    println!(
        "Welcome {}! You have been identified and your private inbox has been set up.\n",
        username.trim()
    );
    Ok(())
}

async fn handle_join(
    client: &ChatClient,
    lines: &mut mpsc::Receiver<String>,
) -> chatrelay_core::Result<()> {
    let Some(channel) = prompt(lines, "Enter the channel name to join: ").await else {
        return Ok(());
    };
    client.join(&channel).await?;
    println!("You've joined the channel: {}\n", channel);
    Ok(())
}

async fn handle_leave(
    client: &ChatClient,
    lines: &mut mpsc::Receiver<String>,
) -> chatrelay_core::Result<()> {
    let Some(channel) = prompt(lines, "Enter the channel name to leave: ").await else {
        return Ok(());
    };
    client.leave(&channel).await?;
    println!("You've left the channel: {}", channel);
    Ok(())
}

async fn handle_send_message(
    client: &ChatClient,
    lines: &mut mpsc::Receiver<String>,
) -> chatrelay_core::Result<()> {
    let Some(channel) = prompt(lines, "Enter the channel name: ").await else {
        return Ok(());
    };
    let Some(message) = prompt(lines, "Enter your message: ").await else {
        return Ok(());
    };

    let is_member = client.send_message(&channel, &message).await?;
    println!("Message sent to channel {}", channel);

    if !is_member {
        let answer = prompt(
            lines,
            &format!(
                "You are not in the channel {}. Would you like to join? (yes/no): \n",
                channel
            ),
        )
        .await;
        if answer.as_deref().is_some_and(|a| a.eq_ignore_ascii_case("yes")) {
            client.join(&channel).await?;
            println!("You've joined the channel: {}\n", channel);
        }
    }
    Ok(())
}

async fn handle_user_info(
    client: &ChatClient,
    lines: &mut mpsc::Receiver<String>,
) -> chatrelay_core::Result<()> {
    let Some(username) = prompt(lines, "Enter username to get info about: ").await else {
        return Ok(());
    };

    let fields = client.user_info(&username).await?;
    if fields.is_empty() {
        println!("No information found for user {}", username);
    } else {
        println!("Info for user {}:\n", username);
        for line in format_fields(&fields, false) {
            println!("{}", line);
        }
    }
    Ok(())
}

async fn handle_send_private(
    client: &ChatClient,
    lines: &mut mpsc::Receiver<String>,
) -> chatrelay_core::Result<()> {
    let Some(recipient) = prompt(lines, "Enter the username of the recipient: ").await else {
        return Ok(());
    };
    let Some(message) = prompt(lines, "Enter your private message: ").await else {
        return Ok(());
    };

    client.send_private(&recipient, &message).await?;
    println!("Private message sent to {}\n", recipient);
    Ok(())
}

async fn handle_list_users(client: &ChatClient) -> chatrelay_core::Result<()> {
    let users = client.list_users().await?;
    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("\nList of all users:");
    for (name, fields) in users {
        println!("- {}", name);
        for line in format_fields(&fields, true) {
            println!("  {}", line);
        }
        println!();
    }
    Ok(())
}

async fn handle_delete_profile(
    client: &ChatClient,
    lines: &mut mpsc::Receiver<String>,
) -> chatrelay_core::Result<()> {
    let Some(username) = client.username().await else {
        return Err(Error::NotIdentified);
    };

    let answer = prompt(
        lines,
        &format!(
            "Are you sure you want to delete your profile, {}? This action cannot be undone. (yes/no): ",
            username
        ),
    )
    .await;
    let confirm = answer.as_deref().is_some_and(|a| a.eq_ignore_ascii_case("yes"));

    if client.delete_profile(confirm).await? {
        println!("Profile for {} has been deleted.", username);
    } else {
        println!("Profile deletion cancelled.\n");
    }
    Ok(())
}

fn sorted(channels: std::collections::HashSet<String>) -> Vec<String> {
    let mut list: Vec<String> = channels.into_iter().collect();
    list.sort();
    list
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
