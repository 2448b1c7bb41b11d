//! End-to-end tests for the `rf` binary
//!
//! Only paths that never reach a provider are exercised here.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
    config: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = dir.path().join("refinery.yml");
        std::fs::write(&config, "llm:\n  default: anthropic/claude-sonnet-4-20250514\n")
            .expect("Failed to write config");
        Self { dir, config }
    }

    fn rf(&self) -> Command {
        let mut cmd = Command::cargo_bin("rf").expect("rf binary not built");
        cmd.current_dir(self.dir.path())
            .env("HOME", self.dir.path())
            .env("XDG_DATA_HOME", self.dir.path().join("data"))
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env("ANTHROPIC_API_KEY", "dummy")
            .arg("--config")
            .arg(&self.config);
        cmd
    }
}

// =============================================================================
// refine
// =============================================================================

#[test]
fn test_quick_refine_prints_prompt_verbatim() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .args(["refine", "--quick", "Write a blog post"])
        .assert()
        .success()
        .stdout("Write a blog post\n");
}

#[test]
fn test_quick_refine_json() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .args(["refine", "--quick", "--json", "Write a blog post"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""refined_prompt": "Write a blog post""#))
        .stdout(predicate::str::contains(r#""lineage": "verbatim""#));
}

#[test]
fn test_quick_refine_reads_stdin() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .args(["refine", "--quick"])
        .write_stdin("  Summarize this paper \n")
        .assert()
        .success()
        .stdout("Summarize this paper\n");
}

#[test]
fn test_quick_and_refine_conflict() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .args(["refine", "--quick", "--refine", "Write a blog post"])
        .assert()
        .failure();
}

#[test]
fn test_missing_api_key_is_reported() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .env_remove("ANTHROPIC_API_KEY")
        .args(["refine", "--quick", "Write a blog post"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}

// =============================================================================
// tweak / answer
// =============================================================================

#[test]
fn test_blank_tweak_instruction_rejected() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .args(["tweak", "Write a blog post", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Tweak instruction must not be empty"));
}

#[test]
fn test_answer_with_unknown_key_rejected() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .args([
            "answer",
            "Write a blog post",
            "--answers",
            r#"{"q9": "developers"}"#,
            "--mapping",
            r#"[{"key": "q0", "text": "Who is the audience?", "required": false}]"#,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown answer key: q9"));
}

#[test]
fn test_answer_mapping_without_required_flag_enforces_answer() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .args([
            "answer",
            "Write a blog post",
            "--answers",
            "{}",
            "--mapping",
            r#"[{"key": "q0", "text": "Who is the audience?"}]"#,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Answer required for: Who is the audience?"));
}

#[test]
fn test_answer_accepts_object_mapping() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .args([
            "answer",
            "Write a blog post",
            "--answers",
            r#"{"q1": "casual"}"#,
            "--mapping",
            r#"{"q0": "Who is the audience?", "q1": "What tone should it have?"}"#,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Answer required for: Who is the audience?"));
}

#[test]
fn test_answer_with_malformed_mapping_rejected() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .args(["answer", "Write a blog post", "--answers", "{}", "--mapping", "not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --mapping JSON"));
}

// =============================================================================
// providers
// =============================================================================

#[test]
fn test_providers_lists_all_known() {
    let sandbox = Sandbox::new();
    sandbox
        .rf()
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("anthropic"))
        .stdout(predicate::str::contains("openai"))
        .stdout(predicate::str::contains("gemini"))
        .stdout(predicate::str::contains("ANTHROPIC_API_KEY"));
}
