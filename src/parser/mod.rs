//! The lex-source parser (spec.md §4.1): a line-driven state machine that
//! recognizes the three lex sections and populates a [`LexFile`].
//!
//! Grounded on `examples/original_source/parser.go`'s `stateFunc`-dispatch
//! design (`statePrologue`/`statePrologueLit`/`stateActions`/
//! `stateActionsCont`/`stateEpilogue`), ported to a Rust enum + method-per-
//! state dispatch rather than function-pointer fields, per spec.md §9's
//! "any target language models this as a tagged variant ... or a set of
//! methods keyed by an enum" guidance.

pub mod action;
pub mod flex_regex;

use tracing::{debug, trace, warn};

use crate::error::{LexForgeError, Result};
use crate::model::LexFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Prologue,
    PrologueLit,
    Actions,
    ActionsCont,
    Epilogue,
}

/// Drives the state machine over a whole `.l` source.
pub struct SourceParser<'a> {
    file_name: &'a str,
    state: ParseState,
    lex: LexFile,
    in_comment: bool,
    /// Indices into `lex.rules` for rules whose action is still the pending
    /// fallthrough marker `"|"`.
    fallthrough_stack: Vec<usize>,
    /// Index of the rule currently being accumulated across ACTIONS_CONT
    /// lines, and its text so far (braces already stripped of the leading
    /// `{`).
    pending_rule: Option<(usize, String)>,
}

impl<'a> SourceParser<'a> {
    pub fn new(file_name: &'a str) -> Self {
        Self {
            file_name,
            state: ParseState::Prologue,
            lex: LexFile::new(),
            in_comment: false,
            fallthrough_stack: Vec::new(),
            pending_rule: None,
        }
    }

    /// Parse a complete `.l` source and return the populated model.
    pub fn parse(file_name: &str, source: &str) -> Result<LexFile> {
        let mut parser = SourceParser::new(file_name);
        for (idx, raw_line) in source.lines().enumerate() {
            let line_no = idx + 1;
            if parser.state != ParseState::ActionsCont
                && raw_line.trim().is_empty()
            {
                continue;
            }
            parser.dispatch(line_no, raw_line)?;
        }
        parser.finish()?;
        Ok(parser.lex)
    }

    /// Dispatch one line to the current state, following re-dispatch when
    /// ACTIONS_CONT hands a line back to ACTIONS.
    fn dispatch(&mut self, line_no: usize, mut line: &str) -> Result<()> {
        loop {
            trace!(state = ?self.state, line_no, "parser state dispatch");
            match self.state {
                ParseState::Prologue => {
                    self.handle_prologue(line_no, line)?;
                    return Ok(());
                }
                ParseState::PrologueLit => {
                    self.handle_prologue_lit(line_no, line)?;
                    return Ok(());
                }
                ParseState::Actions => {
                    self.handle_actions(line_no, line)?;
                    return Ok(());
                }
                ParseState::ActionsCont => {
                    match self.handle_actions_cont(line_no, line)? {
                        Some(redispatch) => {
                            line = redispatch;
                            continue;
                        }
                        None => return Ok(()),
                    }
                }
                ParseState::Epilogue => {
                    self.lex.epilogue.push_str(line);
                    self.lex.epilogue.push('\n');
                    return Ok(());
                }
            }
        }
    }

    fn handle_prologue(&mut self, line_no: usize, raw_line: &str) -> Result<()> {
        if raw_line == "%%" {
            debug!(line_no, "PROLOGUE -> ACTIONS");
            self.state = ParseState::Actions;
            return Ok(());
        }

        let line = self.strip_comments(raw_line);
        if line.trim().is_empty() {
            return Ok(());
        }

        if line == "%{" {
            debug!(line_no, "PROLOGUE -> PROLOGUE_LIT");
            self.state = ParseState::PrologueLit;
            return Ok(());
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            self.lex.prologue_code.push(line.trim().to_string());
            return Ok(());
        }

        if let Some(rest) = line.strip_prefix("%s") {
            for name in rest.split_whitespace() {
                self.lex.declare_start_condition(name, false);
            }
            return Ok(());
        }
        if let Some(rest) = line.strip_prefix("%x") {
            for name in rest.split_whitespace() {
                self.lex.declare_start_condition(name, true);
            }
            return Ok(());
        }
        if let Some(stripped) = line.strip_prefix('%') {
            let directive = stripped.split_whitespace().next().unwrap_or("");
            warn!(line_no, directive, "ignoring unrecognized '%' directive");
            return Ok(());
        }

        let split_at = line.find(|c: char| c == ' ' || c == '\t').ok_or_else(|| {
            LexForgeError::Syntax(
                self.file_name.to_string(),
                line_no,
                format!("don't know what to do with line {line:?} in PROLOGUE"),
            )
        })?;
        let (key, value) = line.split_at(split_at);
        self.lex
            .substitutions
            .insert(key.to_string(), value.trim().to_string());
        Ok(())
    }

    fn handle_prologue_lit(&mut self, line_no: usize, raw_line: &str) -> Result<()> {
        if raw_line == "%}" {
            debug!(line_no, "PROLOGUE_LIT -> PROLOGUE");
            self.state = ParseState::Prologue;
        } else {
            self.lex.preamble.push_str(raw_line);
            self.lex.preamble.push('\n');
        }
        Ok(())
    }

    fn handle_actions(&mut self, line_no: usize, raw_line: &str) -> Result<()> {
        if raw_line == "%%" {
            debug!(line_no, "ACTIONS -> EPILOGUE");
            self.state = ParseState::Epilogue;
            return Ok(());
        }

        if raw_line.starts_with(' ') || raw_line.starts_with('\t') {
            // A prelude line between `%%` and the first rule (or between two
            // finalized rules): inlined at scanner startup like prologue
            // code. Mid-action indented continuation is handled entirely by
            // ACTIONS_CONT, which this state never sees.
            self.lex.prologue_code.push(raw_line.trim().to_string());
            return Ok(());
        }

        let translated = flex_regex::translate_rule_line(
            self.file_name,
            line_no,
            raw_line,
            &self.lex.substitutions,
        )?;
        trace!(line_no, pattern = %translated.pattern, "translated rule pattern");

        let rule = crate::model::LexRule {
            start_conds: translated.start_conds,
            pattern: translated.pattern,
            trailing: translated.trailing,
            sol_anchored: translated.sol_anchored,
            action: String::new(),
            line: line_no,
        };
        let cur_idx = self.lex.rules.len();
        self.lex.rules.push(rule);

        let remainder = translated.remainder.trim();

        if remainder == "|" {
            self.fallthrough_stack.push(cur_idx);
            self.lex.rules[cur_idx].action = "|".to_string();
            return Ok(());
        }

        if let Some(stripped) = remainder.strip_prefix('{') {
            if brace_matches_to_end(remainder) {
                let inner = stripped[..stripped.len() - 1].trim();
                self.commit_action(cur_idx, inner);
            } else {
                self.state = ParseState::ActionsCont;
                self.pending_rule = Some((cur_idx, format!("{stripped}\n")));
            }
            return Ok(());
        }

        self.commit_action(cur_idx, remainder);
        Ok(())
    }

    /// Returns `Some(line)` when the caller must re-dispatch `line` to
    /// ACTIONS (the un-indented terminator case).
    fn handle_actions_cont<'l>(
        &mut self,
        line_no: usize,
        line: &'l str,
    ) -> Result<Option<&'l str>> {
        if line.starts_with(' ') || line.starts_with('\t') || line.trim().is_empty() {
            let (_, acc) = self
                .pending_rule
                .as_mut()
                .expect("ACTIONS_CONT state always has a pending rule");
            acc.push_str(line);
            acc.push('\n');
            return Ok(None);
        }

        let (cur_idx, acc) = self
            .pending_rule
            .take()
            .expect("ACTIONS_CONT state always has a pending rule");
        let trimmed = acc.trim_end();
        let Some(body) = trimmed.strip_suffix('}') else {
            return Err(LexForgeError::MalformedAction(
                self.file_name.to_string(),
                line_no,
            ));
        };

        debug!(line_no, "ACTIONS_CONT -> ACTIONS");
        self.state = ParseState::Actions;
        self.commit_action(cur_idx, body.trim());
        Ok(Some(line))
    }

    /// Assign `action` to `cur_idx` and to every rule still waiting on the
    /// fallthrough stack, then drain the stack (spec.md §3 lifecycle).
    fn commit_action(&mut self, cur_idx: usize, action: &str) {
        self.lex.rules[cur_idx].action = action.to_string();
        for idx in self.fallthrough_stack.drain(..) {
            self.lex.rules[idx].action = action.to_string();
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.state == ParseState::ActionsCont {
            return Err(LexForgeError::MalformedAction(
                self.file_name.to_string(),
                self.lex.rules.last().map(|r| r.line).unwrap_or(0),
            ));
        }
        if !self.fallthrough_stack.is_empty() {
            let line = self.fallthrough_stack.last().and_then(|&i| {
                self.lex.rules.get(i).map(|r| r.line)
            }).unwrap_or(0);
            return Err(LexForgeError::MalformedAction(
                self.file_name.to_string(),
                line,
            ));
        }
        Ok(())
    }

    fn strip_comments(&mut self, line: &str) -> String {
        if !self.in_comment {
            return match line.find("/*") {
                Some(idx) => {
                    self.in_comment = true;
                    let rest = self.strip_comments(&line[idx..]);
                    format!("{}{}", &line[..idx], rest)
                }
                None => line.to_string(),
            };
        }

        match line.find("*/") {
            None => {
                self.in_comment = true;
                String::new()
            }
            Some(idx) => {
                self.in_comment = false;
                self.strip_comments(&line[idx + 2..])
            }
        }
    }
}

/// True when `s` (which must start with `{`) has its matching closing brace
/// at the final character, i.e. the whole remainder is one balanced block.
fn brace_matches_to_end(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    let mut depth = 0i32;
    for (idx, &c) in chars.iter().enumerate() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
                if depth == 0 {
                    return idx == chars.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Parse a complete `.l` source into a [`LexFile`].
pub fn parse_source(file_name: &str, source: &str) -> Result<LexFile> {
    SourceParser::parse(file_name, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitution_then_rule_using_it() {
        let src = "DIGIT [0-9]\n%%\n{DIGIT}+ { ECHO; }\n%%\n";
        let lex = parse_source("t.l", src).unwrap();
        assert_eq!(lex.substitutions["DIGIT"], "[0-9]");
        assert_eq!(lex.rules.len(), 1);
        assert_eq!(lex.rules[0].pattern, "([0-9])+");
        assert_eq!(lex.rules[0].action, "ECHO;");
    }

    #[test]
    fn start_condition_directives_assign_ids() {
        let src = "%x STR COMMENT\n%%\n%%\n";
        let lex = parse_source("t.l", src).unwrap();
        assert_eq!(lex.start_conditions["STR"].id, 1024);
        assert_eq!(lex.start_conditions["COMMENT"].id, 1025);
        assert!(lex.start_conditions["STR"].exclusive);
    }

    #[test]
    fn prologue_literal_is_captured_verbatim() {
        let src = "%{\nuse std::io;\n%}\n%%\n%%\n";
        let lex = parse_source("t.l", src).unwrap();
        assert_eq!(lex.preamble, "use std::io;\n");
    }

    #[test]
    fn one_liner_rule_action_without_braces() {
        let src = "%%\n[a-z]+ return 1;\n%%\n";
        let lex = parse_source("t.l", src).unwrap();
        assert_eq!(lex.rules[0].action, "return 1;");
    }

    #[test]
    fn single_line_brace_action_strips_braces() {
        let src = "%%\n[a-z]+ {return 1;}\n%%\n";
        let lex = parse_source("t.l", src).unwrap();
        assert_eq!(lex.rules[0].action, "return 1;");
    }

    #[test]
    fn multiline_brace_action_terminates_on_unindented_line() {
        // The closing brace must itself be on an indented (continuation)
        // line under the chosen termination policy (spec.md §9): an
        // unindented line always starts the next rule.
        let src =
            "%%\nfoo {\n    let x = 1;\n    return x;\n    }\nbar { return 2; }\n%%\n";
        let lex = parse_source("t.l", src).unwrap();
        assert_eq!(lex.rules.len(), 2);
        assert!(lex.rules[0].action.contains("let x = 1;"));
        assert!(lex.rules[0].action.contains("return x;"));
        assert_eq!(lex.rules[1].action, "return 2;");
    }

    #[test]
    fn unterminated_multiline_action_is_an_error() {
        let src = "%%\nfoo {\n    let x = 1;\n%%\n";
        let err = parse_source("t.l", src).unwrap_err();
        assert!(matches!(err, LexForgeError::MalformedAction(_, _)));
    }

    #[test]
    fn fallthrough_bar_shares_the_next_actions_text() {
        let src = "%%\nfoo |\nbar { return 9; }\n%%\n";
        let lex = parse_source("t.l", src).unwrap();
        assert_eq!(lex.rules.len(), 2);
        assert_eq!(lex.rules[0].action, "return 9;");
        assert_eq!(lex.rules[1].action, "return 9;");
    }

    #[test]
    fn unknown_directive_is_ignored_not_fatal() {
        let src = "%foo bar\n%%\n%%\n";
        let lex = parse_source("t.l", src).unwrap();
        assert!(lex.rules.is_empty());
    }

    #[test]
    fn comment_spanning_multiple_lines_is_stripped() {
        let src =
            "DIGIT [0-9]\n/* this is\na comment */\nLETTER [a-zA-Z]\n%%\n%%\n";
        let lex = parse_source("t.l", src).unwrap();
        assert_eq!(lex.substitutions["DIGIT"], "[0-9]");
        assert_eq!(lex.substitutions["LETTER"], "[a-zA-Z]");
    }

    #[test]
    fn missing_final_separator_still_parses_trailing_rule() {
        let src = "%%\nfoo { return 1; }\n";
        let lex = parse_source("t.l", src).unwrap();
        assert_eq!(lex.rules.len(), 1);
        assert_eq!(lex.epilogue, "");
    }
}
