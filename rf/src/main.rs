//! Refinery - adaptive prompt refinement
//!
//! CLI entry point.

use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use refinery::cli::{Cli, Command, generate_after_help, get_log_path, provider_statuses, resolve_prompt};
use refinery::config::Config;
use refinery::interactive::TerminalPrompter;
use refinery::refine::{
    AnswerSet, CancelToken, QuestionKeyMapping, RefineOptions, RefineOutcome, RefineSession, RefinedPrompt,
    RefinedPromptResult, TaskType,
};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = match Cli::from_arg_matches(&cmd.get_matches()) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    if let Err(e) = run(cli).await {
        debug!(error = ?e, "main: command failed");
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("Refinery loaded config: default={}", config.llm.default);

    debug!(command = ?cli.command, "run: dispatching command");
    match cli.command {
        Command::Refine {
            prompt,
            file,
            quick,
            refine,
            static_questions,
            no_tweak,
            json,
        } => {
            let prompt = resolve_prompt(prompt.as_deref(), file.as_deref(), std::io::stdin())?;
            let overrides = RefineOptions {
                skip_questions: quick,
                force_questions: refine,
                static_questions,
                cancel: None,
            };
            let mut session = open_session(&config, &cli.provider, &cli.model)?;
            cmd_refine(&mut session, &prompt, overrides, no_tweak, json).await
        }
        Command::Tweak {
            prompt,
            instruction,
            json,
        } => {
            let prompt = resolve_prompt(Some(&prompt), None, std::io::empty())?;
            let session = open_session(&config, &cli.provider, &cli.model)?;
            cmd_tweak(&session, &prompt, &instruction, json, cancel_on_ctrl_c()).await
        }
        Command::Answer {
            prompt,
            answers,
            mapping,
            json,
        } => {
            let prompt = resolve_prompt(Some(&prompt), None, std::io::empty())?;
            let answers: AnswerSet = serde_json::from_str(&answers).context("Invalid --answers JSON")?;
            let mapping: QuestionKeyMapping = serde_json::from_str(&mapping).context("Invalid --mapping JSON")?;
            let mut session = open_session(&config, &cli.provider, &cli.model)?;
            let cancel = cancel_on_ctrl_c();
            match cancel.run(session.complete(&prompt, &answers, &mapping)).await {
                Some(result) => print_result(&result?, json),
                None => report_cancelled(json),
            }
        }
        Command::Providers => cmd_providers(&config),
    }
}

fn open_session(config: &Config, provider: &Option<String>, model: &Option<String>) -> Result<RefineSession> {
    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let session = RefineSession::from_config(config, provider.as_deref(), model.as_deref(), &root)?;
    info!(provider = %session.provider_name(), "Session opened");
    Ok(session)
}

/// Token cancelled by the first Ctrl-C of the process
fn cancel_on_ctrl_c() -> CancelToken {
    let token = CancelToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("cancel_on_ctrl_c: interrupt received");
            handle.cancel();
        }
    });
    token
}

fn report_cancelled(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&RefineOutcome::Cancelled)?);
    } else {
        eprintln!("{}", "Refinement cancelled.".yellow());
    }
    Ok(())
}

fn print_result(result: &RefinedPromptResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    eprintln!("{}", "Refined prompt:".bright_cyan().bold());
    println!("{}", result.refined_prompt);
    if let Some(usage) = result.token_usage {
        eprintln!(
            "{}",
            format!("tokens: {} in / {} out / {} total", usage.input, usage.output, usage.total).dimmed()
        );
    }
    Ok(())
}

async fn cmd_refine(
    session: &mut RefineSession,
    prompt: &str,
    overrides: RefineOptions,
    no_tweak: bool,
    json: bool,
) -> Result<()> {
    debug!(?overrides, no_tweak, json, "cmd_refine: called");
    // Explicitly requested questions are asked without confirmation
    let confirm_first = !(overrides.force_questions
        || overrides.static_questions
        || session.defaults().force_questions
        || session.defaults().static_questions);
    let cancel = cancel_on_ctrl_c();
    let overrides = overrides.with_cancel(cancel.clone());
    let outcome = session.start(prompt, &overrides).await?;

    let result = match outcome {
        RefineOutcome::Refined(result) => result,
        RefineOutcome::ClarificationNeeded(request) if json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&RefineOutcome::ClarificationNeeded(request))?
            );
            return Ok(());
        }
        RefineOutcome::ClarificationNeeded(request) => {
            let mut prompter = TerminalPrompter::new()?;
            if confirm_first && request.task_type == TaskType::Generation {
                let question = format!(
                    "{} clarifying questions are available. Ask them to refine your prompt?",
                    request.questions.len()
                );
                if prompter.confirm(&question, true)? != Some(true) {
                    eprintln!("{}", "Skipping questions, using the original prompt.".yellow());
                    return print_result(&RefinedPrompt::verbatim(prompt).into(), json);
                }
            }
            let Some(answers) = prompter.collect_answers(&request)? else {
                eprintln!("{}", "Refinement cancelled.".yellow());
                return Ok(());
            };
            match cancel.run(session.complete(prompt, &answers, &request.mapping)).await {
                Some(result) => result?,
                None => return report_cancelled(false),
            }
        }
        RefineOutcome::Cancelled => return report_cancelled(json),
    };

    print_result(&result, json)?;

    if json || no_tweak || !std::io::stdin().is_terminal() {
        return Ok(());
    }

    let mut prompter = TerminalPrompter::new()?;
    while let Some(instruction) = prompter.tweak_request()? {
        match cancel.run(session.tweak(&instruction)).await {
            Some(Ok(tweaked)) => print_result(&tweaked, false)?,
            Some(Err(e)) => eprintln!("{} {}", "Tweak failed:".red(), e),
            None => {
                eprintln!("{}", "Tweak cancelled.".yellow());
                break;
            }
        }
    }
    Ok(())
}

async fn cmd_tweak(
    session: &RefineSession,
    prompt: &str,
    instruction: &str,
    json: bool,
    cancel: CancelToken,
) -> Result<()> {
    debug!(%instruction, json, "cmd_tweak: called");
    match cancel.run(session.tweak_prompt(prompt, instruction)).await {
        Some(result) => print_result(&result?, json),
        None => report_cancelled(json),
    }
}

fn cmd_providers(config: &Config) -> Result<()> {
    debug!("cmd_providers: called");
    for status in provider_statuses(config) {
        let marker = if status.is_default { "*".bright_green().to_string() } else { " ".to_string() };
        let key = if status.key_set {
            "key set".green()
        } else {
            "key missing".red()
        };
        println!(
            "{} {:<10} {:<20} {}",
            marker,
            status.id,
            status.api_key_env.as_deref().unwrap_or("-"),
            key
        );
    }
    Ok(())
}
