//! Terminal question and tweak prompts
//!
//! A thin line-oriented collaborator: asks clarifying questions, collects
//! answers, and reads tweak requests. Ctrl-C or Ctrl-D cancels.

use colored::Colorize;
use eyre::{Result, eyre};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::refine::{AnswerSet, AnswerValue, ClarificationNeededResult, KeyedQuestion, QuestionKind};

/// Interpret a typed answer for `kind`
///
/// Choice answers accept 1-based option numbers (comma separated for
/// multi choice) or option text. Returns `None` when the input does not
/// name valid options.
pub fn parse_answer(input: &str, kind: QuestionKind, options: &[String]) -> Option<AnswerValue> {
    let input = input.trim();
    match kind {
        QuestionKind::Text => Some(AnswerValue::Text(input.to_string())),
        QuestionKind::SingleChoice => pick_option(input, options).map(AnswerValue::Text),
        QuestionKind::MultiChoice => {
            if input.is_empty() {
                return Some(AnswerValue::Choices(Vec::new()));
            }
            input
                .split(',')
                .map(|part| pick_option(part.trim(), options))
                .collect::<Option<Vec<String>>>()
                .map(AnswerValue::Choices)
        }
    }
}

/// Interpret a yes/no reply; blank takes `default`, anything else is `None`
pub fn parse_confirm(input: &str, default: bool) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

fn pick_option(input: &str, options: &[String]) -> Option<String> {
    if input.is_empty() {
        return Some(String::new());
    }
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| options.get(i)).cloned();
    }
    options.iter().find(|o| o.eq_ignore_ascii_case(input)).cloned()
}

/// Readline-backed prompter
pub struct TerminalPrompter {
    rl: DefaultEditor,
}

impl TerminalPrompter {
    pub fn new() -> Result<Self> {
        debug!("TerminalPrompter::new: called");
        let rl = DefaultEditor::new().map_err(|e| eyre!("Failed to initialize readline: {}", e))?;
        Ok(Self { rl })
    }

    /// Read one line; `None` on Ctrl-C or Ctrl-D
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.rl.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.rl.add_history_entry(line.trim());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => {
                debug!("TerminalPrompter::read_line: interrupted");
                println!("^C");
                Ok(None)
            }
            Err(ReadlineError::Eof) => {
                debug!("TerminalPrompter::read_line: eof");
                println!();
                Ok(None)
            }
            Err(err) => Err(eyre!("Readline error: {}", err)),
        }
    }

    fn print_question(question: &KeyedQuestion, index: usize, total: usize) {
        let marker = if question.required {
            "*".red().to_string()
        } else {
            " ".to_string()
        };
        println!();
        println!(
            "{} {}{}",
            format!("[{}/{}]", index + 1, total).dimmed(),
            question.text.bright_cyan().bold(),
            marker
        );
        if let Some(options) = &question.options {
            for (i, option) in options.iter().enumerate() {
                println!("  {} {}", format!("{}.", i + 1).yellow(), option);
            }
            if question.kind == QuestionKind::MultiChoice {
                println!("  {}", "(comma-separate several choices)".dimmed());
            }
        }
        if let Some(default) = &question.default {
            println!("  {} {}", "default:".dimmed(), default);
        }
    }

    /// Ask one question until it gets an acceptable answer
    ///
    /// `Ok(None)` means the user cancelled.
    pub fn ask(&mut self, question: &KeyedQuestion, index: usize, total: usize) -> Result<Option<AnswerValue>> {
        debug!(key = %question.key, "TerminalPrompter::ask: called");
        Self::print_question(question, index, total);
        let options = question.options.clone().unwrap_or_default();

        loop {
            let Some(line) = self.read_line(&format!("{} ", ">".bright_green()))? else {
                return Ok(None);
            };

            let line = match (&question.default, line.trim().is_empty()) {
                (Some(default), true) => default.clone(),
                _ => line,
            };

            match parse_answer(&line, question.kind, &options) {
                Some(value) if question.required && value.is_blank() => {
                    println!("{}", "An answer is required.".yellow());
                }
                Some(value) => return Ok(Some(value)),
                None => {
                    println!("{}", "Pick one of the listed options.".yellow());
                }
            }
        }
    }

    /// Ask a yes/no question until it gets a yes, a no, or a blank line
    ///
    /// `Ok(None)` means the user cancelled.
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<Option<bool>> {
        debug!(%question, default, "TerminalPrompter::confirm: called");
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        println!();
        println!("{} {}", question.bright_cyan().bold(), hint.dimmed());

        loop {
            let Some(line) = self.read_line(&format!("{} ", ">".bright_green()))? else {
                return Ok(None);
            };
            match parse_confirm(&line, default) {
                Some(answer) => return Ok(Some(answer)),
                None => println!("{}", "Answer y or n.".yellow()),
            }
        }
    }

    /// Ask every question; `Ok(None)` if the user cancelled
    pub fn collect_answers(&mut self, request: &ClarificationNeededResult) -> Result<Option<AnswerSet>> {
        debug!(question_count = request.questions.len(), "TerminalPrompter::collect_answers: called");
        println!(
            "{}",
            "A few questions will help refine this prompt (* = required):".bright_cyan()
        );

        let total = request.questions.len();
        let mut answers = AnswerSet::new();
        for (i, question) in request.questions.iter().enumerate() {
            match self.ask(question, i, total)? {
                Some(value) => answers.insert(question.key.clone(), value),
                None => return Ok(None),
            }
        }
        Ok(Some(answers))
    }

    /// Read a tweak request; `None` accepts the current prompt
    pub fn tweak_request(&mut self) -> Result<Option<String>> {
        debug!("TerminalPrompter::tweak_request: called");
        println!();
        println!("{}", "Describe a tweak, or press Enter to accept:".bright_cyan());
        let line = self.read_line(&format!("{} ", "tweak>".bright_green()))?;
        Ok(line.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()))
    }
}
