//! CLI commands for baton using clap.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{get_settings_path, load_settings, save_settings, Settings};
use crate::core::{Roster, Sequencer};
use crate::history;
use crate::store::MessageStore;

/// baton - pass a message around a ring of agents and keep every hand-off.
#[derive(Parser)]
#[command(name = "baton")]
#[command(version = "0.1.0")]
#[command(about = "baton - round-robin agent relay with a durable message log", long_about = None)]
pub struct Commands {
    /// SQLite database file (overrides settings)
    #[arg(long, global = true, env = "BATON_DB")]
    pub db: Option<PathBuf>,

    /// Comma-separated agent roster (overrides settings)
    #[arg(long, global = true, value_delimiter = ',')]
    pub agents: Option<Vec<String>>,

    /// Delay between agents in milliseconds (overrides settings)
    #[arg(long, global = true)]
    pub delay_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start a new conversation with a seed message
    Start {
        /// Message handed to the first agent
        message: String,

        /// Number of turns to run
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        turns: u32,
    },

    /// Continue the stored conversation
    Continue {
        /// Number of turns to run
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        turns: u32,
    },

    /// View message history
    History {
        /// Print as JSON
        #[arg(long)]
        json: bool,

        /// Show full message content instead of a preview
        #[arg(long)]
        full: bool,
    },

    /// Clear the database
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Show store statistics and roster
    Status,

    /// Settings commands
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Interactive menu
    Shell,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print effective settings
    Show,

    /// Write default settings to ~/.baton/settings.json
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        // Init must work even when the existing settings file is broken.
        if let Command::Config(ConfigCommand::Init { force }) = &self.command {
            return config_init(&get_settings_path()?, *force);
        }

        let settings = self.effective_settings()?;
        if let Command::Config(ConfigCommand::Show) = &self.command {
            return config_show(&settings);
        }

        let relay = Relay::open(&settings).await?;
        match &self.command {
            Command::Start { message, turns } => relay.run_turns(Some(message.clone()), *turns).await,
            Command::Continue { turns } => relay.run_turns(None, *turns).await,
            Command::History { json, full } => relay.print_history(*json, *full).await,
            Command::Clear { yes } => relay.clear(*yes).await,
            Command::Status => relay.status().await,
            Command::Shell => relay.shell().await,
            Command::Config(_) => Ok(()),
        }
    }

    fn effective_settings(&self) -> Result<Settings> {
        let mut settings = load_settings()?;
        if let Some(db) = &self.db {
            settings.database_path = Some(db.clone());
        }
        if let Some(agents) = &self.agents {
            settings.roster = Roster::new(agents.iter().map(|a| a.trim()).filter(|a| !a.is_empty()));
        }
        if let Some(delay) = self.delay_ms {
            settings.turn_delay_ms = delay;
        }
        Ok(settings)
    }
}

/// Run store-bound work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// Store and sequencer wired up from settings.
struct Relay {
    sequencer: Arc<Sequencer>,
    preview_chars: usize,
}

impl Relay {
    async fn open(settings: &Settings) -> Result<Self> {
        let path = settings.database_path()?;
        let store = blocking(move || MessageStore::open(path)).await?;
        tracing::info!("Database initialized at {}", store.path().display());

        let sequencer = Sequencer::new(Arc::new(store), settings.roster.clone())
            .with_pacing(Duration::from_millis(settings.turn_delay_ms));

        Ok(Self {
            sequencer: Arc::new(sequencer),
            preview_chars: settings.preview_chars,
        })
    }

    fn store(&self) -> Arc<MessageStore> {
        self.sequencer.store().clone()
    }

    async fn run_turns(&self, seed: Option<String>, turns: u32) -> Result<()> {
        for turn in 0..turns {
            if turns > 1 {
                println!("\n--- Turn {} ---", turn + 1);
            }
            let seq = self.sequencer.clone();
            let seed = if turn == 0 { seed.clone() } else { None };
            let responses = blocking(move || seq.execute_turn(seed.as_deref())).await?;

            println!("\nResponses from this turn:");
            for (agent, response) in self.sequencer.roster().iter().zip(&responses) {
                println!("{}: {}", agent, response);
            }
        }
        Ok(())
    }

    async fn print_history(&self, json: bool, full: bool) -> Result<()> {
        let store = self.store();
        let entries = blocking(move || store.all_ordered_by_time()).await?;

        if json {
            println!("{}", history::to_json(&entries)?);
            return Ok(());
        }
        if entries.is_empty() {
            println!("\nNo messages found in the database.");
            return Ok(());
        }

        println!("\n=== Message History ===");
        for entry in &entries {
            if full {
                println!("{}", entry);
            } else {
                println!("{}", history::format_entry(entry, self.preview_chars));
            }
        }
        Ok(())
    }

    async fn clear(&self, yes: bool) -> Result<()> {
        let store = self.store();
        if !yes {
            let answer = prompt("Are you sure you want to clear the database? (y/n): ")?;
            if !answer.is_some_and(|a| a.eq_ignore_ascii_case("y")) {
                println!("Clear cancelled.");
                return Ok(());
            }
        }

        let path = store.path().display().to_string();
        blocking(move || store.reset()).await?;
        println!("Database {} has been cleared.", path);
        Ok(())
    }

    async fn status(&self) -> Result<()> {
        let store = self.store();
        let path = store.path().display().to_string();
        let stats = blocking(move || store.stats()).await?;

        println!("Database: {}", path);
        println!("Roster:   {}", self.sequencer.roster());
        println!("{}", stats);
        Ok(())
    }

    async fn shell(&self) -> Result<()> {
        println!("\n=== baton ===");
        println!("Agents pass a message around the roster, one turn at a time.");

        loop {
            println!("\nOptions:");
            println!("1. Start a new conversation");
            println!("2. Continue existing conversation");
            println!("3. View message history");
            println!("4. Clear database");
            println!("5. Exit");

            let Some(choice) = prompt("\nEnter your choice (1-5): ")? else {
                break;
            };

            match choice.as_str() {
                "1" => {
                    let Some(seed) = prompt("Enter an initial message to start the conversation: ")? else {
                        break;
                    };
                    println!("\nStarting conversation...");
                    self.run_turns(Some(seed), 1).await?;
                }
                "2" => {
                    println!("\nContinuing conversation...");
                    self.run_turns(None, 1).await?;
                }
                "3" => self.print_history(false, false).await?,
                "4" => self.clear(false).await?,
                "5" => break,
                _ => println!("Invalid choice. Please enter a number between 1 and 5."),
            }
        }

        println!("Goodbye!");
        Ok(())
    }
}

/// Print `message` and read one trimmed line. `None` on end of input.
fn prompt(message: &str) -> Result<Option<String>> {
    let mut stdout = io::stdout();
    print!("{}", message);
    stdout.flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn config_show(settings: &Settings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    println!("Database: {}", settings.database_path()?.display());
    Ok(())
}

/// Write default settings to `path`. Never reads what is already there.
fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Settings already exist at {} (use --force to overwrite)", path.display());
        return Ok(());
    }
    save_settings(&Settings::default(), path)?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        let cmd = Commands::try_parse_from(["baton", "start", "hello", "--turns", "3"]).unwrap();
        match cmd.command {
            Command::Start { message, turns } => {
                assert_eq!(message, "hello");
                assert_eq!(turns, 3);
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn test_parse_global_overrides() {
        let cmd = Commands::try_parse_from([
            "baton",
            "continue",
            "--agents",
            "A,B,C",
            "--db",
            "/tmp/x.db",
            "--delay-ms",
            "0",
        ])
        .unwrap();

        assert_eq!(
            cmd.agents,
            Some(vec!["A".to_string(), "B".to_string(), "C".to_string()])
        );
        assert_eq!(cmd.db, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cmd.delay_ms, Some(0));
        assert!(matches!(cmd.command, Command::Continue { turns: 1 }));
    }

    #[test]
    fn test_parse_rejects_zero_turns() {
        assert!(Commands::try_parse_from(["baton", "continue", "--turns", "0"]).is_err());
        assert!(Commands::try_parse_from(["baton", "start", "hi", "--turns", "0"]).is_err());
    }

    #[test]
    fn test_config_init_force_repairs_invalid_settings() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"preview_chars": 0}"#).unwrap();
        assert!(crate::config::load_settings_from(&path).is_err());

        config_init(&path, true).unwrap();

        let repaired = crate::config::load_settings_from(&path).unwrap();
        assert_eq!(repaired.preview_chars, 50);
    }

    #[test]
    fn test_config_init_keeps_existing_without_force() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        config_init(&path, false).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }

    #[test]
    fn test_parse_clear_yes() {
        let cmd = Commands::try_parse_from(["baton", "clear", "-y"]).unwrap();
        assert!(matches!(cmd.command, Command::Clear { yes: true }));
    }

    #[tokio::test]
    async fn test_relay_runs_turns_against_temp_db() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings {
            database_path: Some(dir.path().join("relay.db")),
            roster: Roster::new(["A", "B"]),
            turn_delay_ms: 0,
            preview_chars: 10,
        };

        let relay = Relay::open(&settings).await.unwrap();
        relay.run_turns(Some("hello".to_string()), 2).await.unwrap();

        let stats = relay.store().stats().unwrap();
        assert_eq!(stats.messages, 4);
        assert_eq!(stats.hand_offs, 4);

        relay.clear(true).await.unwrap();
        assert!(relay.store().all_ordered_by_time().unwrap().is_empty());
    }
}
