//! CLI command definitions and subcommands

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{Context, Result, eyre};
use tracing::debug;

use crate::config::Config;
use crate::llm::ProviderKind;

/// Refinery - adaptive prompt refinement
#[derive(Parser)]
#[command(
    name = "rf",
    about = "Refine rough prompts into precise ones with clarifying questions",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Provider id, overriding the configured default
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model id, overriding the configured default
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refine a prompt, asking clarifying questions when useful
    Refine {
        /// Prompt text, or @path to read it from a file; read from stdin when omitted
        prompt: Option<String>,

        /// Read the prompt from a file
        #[arg(short, long, conflicts_with = "prompt")]
        file: Option<PathBuf>,

        /// Skip questions and return the prompt unchanged
        #[arg(short, long, conflicts_with = "refine")]
        quick: bool,

        /// Ask questions even for analysis prompts
        #[arg(short, long)]
        refine: bool,

        /// Use the fixed question set instead of generated questions
        #[arg(long = "static")]
        static_questions: bool,

        /// Do not offer tweaks after refinement
        #[arg(long)]
        no_tweak: bool,

        /// Print results as JSON and never prompt
        #[arg(long)]
        json: bool,
    },

    /// Apply one modification request to a prompt
    Tweak {
        /// Prompt text, or @path to read it from a file
        prompt: String,

        /// What to change
        instruction: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Finish a refinement with answers to previously returned questions
    Answer {
        /// Prompt text, or @path to read it from a file
        prompt: String,

        /// Answers as a JSON object keyed by question key
        #[arg(long)]
        answers: String,

        /// Question key mapping as returned by `refine --json`
        #[arg(long)]
        mapping: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List providers and whether their API keys are set
    Providers,
}

/// Read a prompt given inline, as `@path`, or from a file argument
///
/// With neither, the prompt is read from `stdin`.
pub fn resolve_prompt(inline: Option<&str>, file: Option<&Path>, stdin: impl Read) -> Result<String> {
    debug!(?inline, ?file, "resolve_prompt: called");
    let text = match (inline, file) {
        (_, Some(path)) => read_prompt_file(path)?,
        (Some(s), None) => match s.strip_prefix('@') {
            Some(path) if !path.is_empty() => read_prompt_file(Path::new(path))?,
            _ => s.to_string(),
        },
        (None, None) => {
            debug!("resolve_prompt: reading stdin");
            let mut buf = String::new();
            let mut stdin = stdin;
            stdin.read_to_string(&mut buf).context("Failed to read prompt from stdin")?;
            buf
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(eyre!("No prompt given. Pass it as an argument, with --file, or on stdin."));
    }
    Ok(text)
}

fn read_prompt_file(path: &Path) -> Result<String> {
    debug!(?path, "read_prompt_file: called");
    std::fs::read_to_string(path).context(format!("Failed to read prompt file {}", path.display()))
}

/// One row of `rf providers`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub id: &'static str,
    pub api_key_env: Option<String>,
    pub key_set: bool,
    pub is_default: bool,
}

/// Status of every known provider under `config`
pub fn provider_statuses(config: &Config) -> Vec<ProviderStatus> {
    debug!("provider_statuses: called");
    let default_provider = config.llm.default.split('/').next().unwrap_or_default();
    ProviderKind::ALL
        .iter()
        .map(|kind| {
            let id = kind.id();
            let api_key_env = config.llm.providers.get(id).map(|p| p.api_key_env.clone());
            let key_set = api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .is_some_and(|v| !v.trim().is_empty());
            ProviderStatus {
                id,
                api_key_env,
                key_set,
                is_default: id == default_provider,
            }
        })
        .collect()
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("refinery")
        .join("logs")
        .join("refinery.log")
}

/// Generate the after_help text with provider key status and the log path
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let config = Config::default();
    let mut help = String::from("Providers:\n");
    for status in provider_statuses(&config) {
        let icon = if status.key_set { "\u{2705}" } else { "\u{274C}" };
        let env = status.api_key_env.as_deref().unwrap_or("-");
        help.push_str(&format!("  {} {:<10} {}\n", icon, status.id, env));
    }

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}
