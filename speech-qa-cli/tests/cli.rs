use assert_cmd::Command;
use predicates::prelude::*;

fn speech_qa() -> Command {
    let mut cmd = Command::cargo_bin("speech-qa").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn missing_speech_file_prints_hint_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let speech = dir.path().join("missing.txt");

    speech_qa()
        .arg("--speech-file")
        .arg(&speech)
        .arg("--index-dir")
        .arg(dir.path().join("index"))
        .arg("--config")
        .arg(dir.path().join("config.yaml"))
        .args(["-q", "What is the real remedy?"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Error: File not found"))
        .stdout(predicate::str::contains(format!("Make sure '{}' exists!", speech.display())));

    assert!(!dir.path().join("index").exists());
}

#[test]
fn unknown_embedding_model_is_an_unexpected_error() {
    let dir = tempfile::tempdir().unwrap();

    speech_qa()
        .arg("--config")
        .arg(dir.path().join("config.yaml"))
        .args(["--embedding-model", "no-such-model", "-q", "hello"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Unexpected error: Unknown embedding model 'no-such-model'"));
}

#[test]
fn broken_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    std::fs::write(&config, "rag:\n  chunk_size: [not, a, number]\n").unwrap();

    speech_qa()
        .arg("--config")
        .arg(&config)
        .args(["-q", "hello"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Unexpected error: Failed to parse config"));
}

#[test]
fn help_lists_flags() {
    speech_qa()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--rebuild"))
        .stdout(predicate::str::contains("--question"))
        .stdout(predicate::str::contains("--speech-file"));
}
