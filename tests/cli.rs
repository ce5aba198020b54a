//! End-to-end tests driving the built `lexforge` binary (spec.md §8's six
//! concrete scenarios). These assert properties of the *generated* Rust
//! source rather than compiling and running it, since the translator's job
//! ends at emitting that source.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn run_lexforge(source: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("scanner.l");
    std::fs::write(&input, source).expect("write fixture");
    let output = dir.path().join("scanner.rs");

    Command::cargo_bin("lexforge")
        .unwrap()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    std::fs::read_to_string(&output).expect("read generated output")
}

#[test]
fn one_liner_brace_action_emits_a_user_return() {
    let generated = run_lexforge("%%\n[a-z]+ { return 1; }\n%%\n");
    assert!(generated.contains("[a-z]+"));
    assert!(generated.contains("UserReturn"));
    assert!(generated.contains("1"));
}

#[test]
fn substitution_and_echo_are_translated() {
    let generated = run_lexforge("DIGIT [0-9]\n%%\n{DIGIT}+ { ECHO; }\n%%\n");
    assert!(generated.contains("([0-9])+"));
    assert!(generated.contains("yy_echo"));
}

#[test]
fn trailing_context_splits_pattern_and_trailing_regex() {
    let generated = run_lexforge("%%\nfoo/bar { return 7; }\n%%\n");
    assert!(generated.contains("regex: Regex::new(\"foo\")"));
    assert!(generated.contains("trailing: Some(Regex::new(\"bar\")"));
}

#[test]
fn rules_are_emitted_in_source_order_for_longest_match_tie_break() {
    let generated = run_lexforge("%%\nabc { return 1; }\nabcd { return 2; }\n%%\n");
    let abc_pos = generated.find("\"abc\"").expect("abc regex present");
    let abcd_pos = generated.find("\"abcd\"").expect("abcd regex present");
    assert!(abc_pos < abcd_pos, "rule source order must be preserved");
}

#[test]
fn yymore_action_is_rewritten_to_scanner_method() {
    let generated = run_lexforge("%%\na { yymore(); }\nb { return 9; }\n%%\n");
    assert!(
        generated.contains("scanner . yy_more ()") || generated.contains("scanner.yy_more()"),
        "expected the action's bare yymore() call to be rewritten to scanner.yy_more() in the rules table, got:\n{generated}"
    );
    assert!(generated.contains("UserReturn (9)") || generated.contains("UserReturn(9)"));
}

#[test]
fn exclusive_start_condition_declares_a_constant_and_begin_calls() {
    let generated = run_lexforge(
        "%x STR\n%%\n\\\" { BEGIN(STR); }\n<STR>[^\"]+ { return 3; }\n<STR>\\\" { BEGIN(INITIAL); }\n%%\n",
    );
    assert!(generated.contains("pub const STR:"));
    assert!(generated.contains("yy_begin (STR)") || generated.contains("yy_begin(STR)"));
    assert!(generated.contains("yy_begin (INITIAL)") || generated.contains("yy_begin(INITIAL)"));
}

#[test]
fn check_flag_does_not_write_output() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("scanner.l");
    std::fs::write(&input, "%%\n[a-z]+ { return 1; }\n%%\n").unwrap();
    let output = dir.path().join("scanner.rs");

    Command::cargo_bin("lexforge")
        .unwrap()
        .arg(&input)
        .arg("--check")
        .assert()
        .success();

    assert!(!output.exists());
}

#[test]
fn malformed_repetition_range_is_a_fatal_error() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("scanner.l");
    std::fs::write(&input, "%%\na{5,2} { return 1; }\n%%\n").unwrap();

    Command::cargo_bin("lexforge")
        .unwrap()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid repetition range"));
}
