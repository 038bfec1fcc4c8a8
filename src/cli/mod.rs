//! Command-line interface for offline inspection of the mediator.

mod doctor;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::classifier::{ClassifierPolicy, TransactionClassifier, WalletContext};
use crate::config::MediatorConfig;
use crate::gateway::OfflineGateway;
use crate::settings::Settings;
use crate::transaction::PendingTransaction;

pub use self::doctor::run_doctor_command;

#[derive(Parser, Debug)]
#[command(name = "approval-mediator", version, about)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ~/.approval-mediator/config.toml).
    #[arg(long, global = true, env = "MEDIATOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a pending transaction read from a JSON file.
    Classify {
        /// JSON file holding `{id, origin, transaction, assetType?}`.
        #[arg(long)]
        file: PathBuf,
    },
    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommand>,
    },
    /// Validate configuration and report problems.
    Doctor {
        /// Exit non-zero when any check fails.
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the resolved configuration as JSON (default).
    Show,
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = self.config.as_deref();
        match self.command {
            Command::Classify { file } => run_classify(&file, config_path).await,
            Command::Config { command } => match command.unwrap_or(ConfigCommand::Show) {
                ConfigCommand::Show => run_config_show(config_path),
                ConfigCommand::Init { force } => run_config_init(config_path, force),
            },
            Command::Doctor { strict } => run_doctor_command(config_path, strict),
        }
    }
}

async fn run_classify(file: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = MediatorConfig::from_env_with_toml(config_path)?;
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let tx: PendingTransaction = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a pending transaction", file.display()))?;

    let classifier =
        TransactionClassifier::new(ClassifierPolicy::from(&config), Arc::new(OfflineGateway));
    let classification = classifier
        .classify(tx, &WalletContext::from_config(&config))
        .await;

    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

fn run_config_show(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = MediatorConfig::from_env_with_toml(config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn run_config_init(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_toml_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }

    Settings::default()
        .save_toml(&path)
        .map_err(anyhow::Error::msg)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_defaults_to_show() {
        let cli = Cli::try_parse_from(["approval-mediator", "config"]).expect("parses");
        assert!(matches!(cli.command, Command::Config { command: None }));
    }

    #[test]
    fn classify_requires_file() {
        assert!(Cli::try_parse_from(["approval-mediator", "classify"]).is_err());
        let cli = Cli::try_parse_from([
            "approval-mediator",
            "classify",
            "--file",
            "tx.json",
            "--config",
            "custom.toml",
        ])
        .expect("parses");
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn config_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        run_config_init(Some(&path), false).expect("first init");
        assert!(path.exists());
        assert!(run_config_init(Some(&path), false).is_err());
        run_config_init(Some(&path), true).expect("forced init");
    }
}
