use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const HEADER: &str = "Word\tFrequency\tLemma\tPOS\tGloss\tMorphemes\tMorpheme_Count";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../lemmatch-reference/tests/fixtures")
        .join(name)
}

fn run(words: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lemmatch"))
        .arg("--reference")
        .arg(fixture("morphemes.tsv"))
        .arg("--words")
        .arg(words)
        .args(extra)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn word_list(dir: &Path) -> PathBuf {
    let path = dir.join("words.csv");
    std::fs::write(&path, "Freq,Word\n12,ორი\n2,ზღვა\n1,კარი\n").unwrap();
    path
}

#[test]
fn prints_matched_rows_as_tsv() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&word_list(dir.path()), &[]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout,
        format!("{HEADER}\nორი\t12\tორი\tNUM\ttwo\tორ-ი\t2\nკარი\t1\tკარი\tNOUN\tdoor\tკარ-ი\t2\n")
    );
}

#[test]
fn include_unmatched_keeps_every_word_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&word_list(dir.path()), &["--include-unmatched", "--stats"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], HEADER);
    assert!(lines[1].starts_with("ორი\t12\t"));
    assert_eq!(lines[2], "ზღვა\t2\t\t\t\t\t");
    assert!(lines[3].starts_with("კარი\t1\t"));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Matched   : 2"));
    assert!(stderr.contains("Unmatched : 1"));
}

#[test]
fn output_flag_writes_a_file_instead_of_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.tsv");
    let output = run(
        &word_list(dir.path()),
        &["--output", target.to_str().unwrap(), "--mode", "owned"],
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.starts_with(HEADER));
    assert_eq!(written.lines().count(), 3);
}

#[test]
fn missing_word_column_fails_with_a_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "Token\nორი\n").unwrap();
    let output = run(&path, &[]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Word"));
}
