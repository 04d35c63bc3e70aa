/*
sharesum - command-line front end for the summarization pipeline.
Reads shared text (flag, file or stdin), applies the stored settings and prints the summary.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{
    Config, FileSettingsStore, KnownModel, LlmConfig, SettingKey, SettingsStore, UserSettings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

use sharesum::llm::prompt::build_prompt;
use sharesum::llm::remote::GeminiProvider;
use sharesum::llm::summarizer::{SummarizationClient, SummaryRequest};
use sharesum::llm::{GenerationConfig, SummaryResult};
use sharesum::share::{resolve_shared_text, SharedContent};

const PREVIEW_SAMPLE: &str = "Rust is a systems programming language focused on safety, speed and concurrency. \
It achieves memory safety without a garbage collector through its ownership model. \
The compiler checks borrowing rules at compile time. \
Cargo, its package manager, makes it easy to share libraries called crates.";

#[derive(Parser, Debug)]
#[command(name = "sharesum", about = "Summarize shared text and links")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize text given inline, from a file, or on stdin
    Summarize {
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Subject line that came with the share
        #[arg(long)]
        subject: Option<String>,

        /// Length level 1-5 for this request only
        #[arg(long)]
        length: Option<i64>,

        /// Model id for this request only
        #[arg(long)]
        model: Option<String>,

        /// API key for this request only
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Print the prompt the current settings would send
    Preview {
        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        length: Option<i64>,
    },
    /// Read or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Show one setting, or all of them
    Get { key: Option<String> },
    /// Store a setting
    Set { key: String, value: String },
    /// List the selectable models
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only the summary
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = load_config(args.config).await?;

    let store = FileSettingsStore::open(config.settings.path())
        .with_context(|| format!("Failed to open settings at {}", config.settings.path()))?;
    debug!(path = %store.path().display(), "settings store opened");

    match args.command {
        Command::Summarize {
            text,
            file,
            subject,
            length,
            model,
            api_key,
        } => {
            let raw = read_input(text, file).await?;
            let mut content = SharedContent::new(raw);
            if let Some(subject) = subject {
                content = content.with_subject(subject);
            }
            let input = resolve_shared_text(content, &config.share).await;
            if input.trim().is_empty() {
                anyhow::bail!("Nothing to summarize: input is empty");
            }

            // Settings are read fresh for every request
            let settings = UserSettings::load(&store);
            let mut request = SummaryRequest::from_settings(input, &settings);
            if let Some(level) = length {
                request = request.with_length_level(level);
            }
            if let Some(model) = model {
                request.model_id = model;
            }
            request.api_key = resolve_api_key(api_key, &request.api_key, &config.llm);

            let client = build_client(&request, &config.llm)?;

            match client.summarize(&request).await {
                SummaryResult::Success { text } => println!("{}", text),
                SummaryResult::Failure { message } => {
                    error!("summarization failed");
                    eprintln!("{}", message);
                    std::process::exit(1);
                }
            }
        }
        Command::Preview { text, length } => {
            let settings = UserSettings::load(&store);
            let level = length.unwrap_or_else(|| i64::from(settings.summary_length));
            let text = text.unwrap_or_else(|| PREVIEW_SAMPLE.to_string());
            println!("{}", build_prompt(&text, level, &settings.summary_prompt));
        }
        Command::Settings { action } => run_settings(action, &store)?,
    }

    Ok(())
}

/// `config.default.toml` merged with `--config FILE` or `./config.toml`
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let config = Config::load_with_defaults(Some(&default_path), override_path.as_deref()).await?;
    info!(default_path = ?default_path, override_path = ?override_path, "configuration loaded");
    Ok(config)
}

async fn read_input(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read input file: {}", path.display()));
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("Failed to read stdin")?;
    Ok(buf)
}

fn run_settings(action: SettingsAction, store: &dyn SettingsStore) -> Result<()> {
    match action {
        SettingsAction::Get { key: Some(key) } => {
            let key: SettingKey = key.parse()?;
            println!("{}", display_value(key, store.get(key).as_deref()));
        }
        SettingsAction::Get { key: None } => {
            for key in SettingKey::ALL {
                println!("{} = {}", key, display_value(key, store.get(key).as_deref()));
            }
        }
        SettingsAction::Set { key, value } => {
            let key: SettingKey = key.parse()?;
            store.set(key, &value)?;
            info!(key = %key, "setting updated");
        }
        SettingsAction::Models => {
            let current = UserSettings::load(store).selected_model;
            for model in KnownModel::ALL {
                let marker = if model == current { "*" } else { " " };
                println!("{} {:<24} {}", marker, model.id(), model.display_name());
            }
        }
    }
    Ok(())
}

/// `--api-key` flag, then the stored key, then the env var named in `[llm]`
fn resolve_api_key(flag: Option<String>, stored: &str, llm: &LlmConfig) -> String {
    if let Some(key) = flag {
        return key;
    }
    if !stored.trim().is_empty() {
        return stored.to_string();
    }
    llm.api_key_from_env().unwrap_or_else(|| stored.to_string())
}

/// The HTTP client is only built when a key will actually be sent
fn build_client(request: &SummaryRequest, llm: &LlmConfig) -> Result<SummarizationClient> {
    if !request.has_api_key() {
        return Ok(SummarizationClient::offline());
    }
    let provider = GeminiProvider::from_config(llm)?;
    Ok(SummarizationClient::new(Arc::new(provider))
        .with_generation(GenerationConfig::from_config(llm)))
}

fn display_value(key: SettingKey, value: Option<&str>) -> String {
    match (key, value) {
        (_, None) => "(unset)".to_string(),
        (SettingKey::ApiKey, Some(v)) => mask_secret(v),
        (_, Some(v)) => v.to_string(),
    }
}

fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
