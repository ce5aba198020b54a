//! The emitter (spec.md §4.4): serializes a [`LexFile`] into a single
//! self-contained Rust source file, splicing in the fixed runtime template.
//!
//! Regex-quoting is grounded on `examples/original_source/parser.go`'s
//! `quoteRegexp`, including its two-pass hex/octal/NUL re-encoding — ported
//! from Go string-literal escaping to Rust string-literal escaping (both
//! support `\xNN` for control bytes, so the re-encoded form carries over
//! unchanged).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{LexForgeError, Result};
use crate::model::{self, LexFile, StartCondSet};
use crate::parser::action;

/// Matches a doubled-backslash hex/octal escape (`\\101`, `\\x41`) surviving
/// the initial backslash-doubling pass.
static HEX_OR_OCTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\\([0-9]{3}|[xX][0-9a-fA-F]{2})").unwrap());
/// Matches a doubled-backslash `\\0` NUL escape not itself the head of a
/// longer octal run, capturing whatever followed so it can be reattached.
static NUL_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\\0($|[^0-9]|[0-9][^0-9])").unwrap());

const RUNTIME_TEMPLATE: &str = include_str!("../templates/runtime.rs.tmpl");

/// Escape `re` (a portable regex source string) for embedding as a Rust
/// string literal, re-encoding octal/hex/NUL escapes so control characters
/// below 0x20 become `\xNN` and printable escaped characters become their
/// regex-quoted literal form (spec.md §4.4).
pub fn quote_regex_literal(re: &str) -> String {
    let mut s = re.replace('\\', "\\\\").replace('"', "\\\"");

    s = HEX_OR_OCTAL
        .replace_all(&s, |caps: &regex::Captures| {
            let digits = &caps[1];
            let n = if digits.starts_with('x') || digits.starts_with('X') {
                u32::from_str_radix(&digits[1..], 16).unwrap_or(0)
            } else {
                u32::from_str_radix(digits, 8).unwrap_or(0)
            };
            if n < 32 {
                format!("\\x{n:02x}")
            } else {
                let ch = char::from_u32(n).unwrap_or('\u{FFFD}');
                regex::escape(&ch.to_string()).replace('\\', "\\\\")
            }
        })
        .to_string();

    s = NUL_ESCAPE
        .replace_all(&s, |caps: &regex::Captures| format!("\\x00{}", &caps[1]))
        .to_string();

    s
}

fn resolve_start_condition_id(file: &LexFile, file_name: &str, line: usize, name: &str) -> Result<u32> {
    if name == model::INITIAL_START_CONDITION_NAME {
        return Ok(model::INITIAL_START_CONDITION_ID);
    }
    file.start_conditions
        .get(name)
        .map(|sc| sc.id)
        .ok_or_else(|| {
            LexForgeError::UndefinedReference(file_name.to_string(), line, name.to_string())
        })
}

/// Render the whole scanner source for `file`.
pub fn emit(file_name: &str, file: &LexFile) -> Result<String> {
    let mut out = String::new();

    out.push_str("// Code generated by lexforge. DO NOT EDIT.\n");
    out.push_str("#![allow(dead_code, unused_variables, unused_mut)]\n\n");
    if !file.preamble.is_empty() {
        out.push_str(&file.preamble);
        out.push('\n');
    }

    out.push_str("use std::io::{Read, Write};\n");
    out.push_str("use once_cell::sync::Lazy;\n");
    out.push_str("use regex::Regex;\n\n");

    out.push_str(&emit_globals(file));

    if !file.prologue_code.is_empty() {
        out.push_str("fn yy_init(scanner: &mut Scanner) {\n");
        for line in &file.prologue_code {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("}\n\n");
    } else {
        out.push_str("fn yy_init(_scanner: &mut Scanner) {}\n\n");
    }

    out.push_str(&emit_rules_table(file_name, file)?);

    out.push_str(RUNTIME_TEMPLATE);
    out.push('\n');

    out.push_str(&file.epilogue);

    Ok(out)
}

fn emit_globals(file: &LexFile) -> String {
    let mut s = String::new();

    s.push_str(&format!(
        "pub const {}: u32 = {};\n",
        model::INITIAL_START_CONDITION_NAME,
        model::INITIAL_START_CONDITION_ID
    ));
    for (name, sc) in &file.start_conditions {
        s.push_str(&format!("pub const {name}: u32 = {};\n", sc.id));
    }
    s.push('\n');

    s.push_str("static YY_EXCLUSIVE: &[(u32, bool)] = &[\n");
    s.push_str(&format!(
        "    ({}, false),\n",
        model::INITIAL_START_CONDITION_NAME
    ));
    for (name, sc) in &file.start_conditions {
        s.push_str(&format!("    ({name}, {}),\n", sc.exclusive));
    }
    s.push_str("];\n\n");

    s.push_str(
        "#[derive(Debug, Clone, Copy, PartialEq, Eq)]\n\
         pub enum YyAction {\n    \
         FallThrough,\n    \
         UserReturn(i64),\n    \
         Reject,\n\
         }\n\n",
    );

    s.push_str(
        "pub struct YyRule {\n    \
         pub regex: Regex,\n    \
         pub trailing: Option<Regex>,\n    \
         pub start_conds: &'static [u32],\n    \
         pub wildcard: bool,\n    \
         pub sol_anchored: bool,\n    \
         pub action: Box<dyn Fn(&mut Scanner) -> YyAction + Sync + Send>,\n\
         }\n\n",
    );

    s
}

fn emit_rules_table(file_name: &str, file: &LexFile) -> Result<String> {
    let mut s = String::new();
    s.push_str("static YY_RULES: Lazy<Vec<YyRule>> = Lazy::new(|| vec![\n");

    for rule in &file.rules {
        let action_src = action::transform_action(file_name, rule.line, &rule.action)?;
        let regex_lit = quote_regex_literal(&rule.pattern);
        let trailing_lit = rule.trailing.as_deref().map(quote_regex_literal);

        let (start_conds_lit, wildcard) = match &rule.start_conds {
            StartCondSet::AnyInclusive => ("&[]".to_string(), false),
            StartCondSet::Wildcard => ("&[]".to_string(), true),
            StartCondSet::Named(names) => {
                let mut ids = Vec::with_capacity(names.len());
                for name in names {
                    ids.push(
                        resolve_start_condition_id(file, file_name, rule.line, name)?.to_string(),
                    );
                }
                (format!("&[{}]", ids.join(", ")), false)
            }
        };

        s.push_str("    YyRule {\n");
        s.push_str(&format!(
            "        regex: Regex::new(\"{regex_lit}\").expect(\"lexforge-generated regex is always valid\"),\n"
        ));
        match trailing_lit {
            Some(t) => s.push_str(&format!(
                "        trailing: Some(Regex::new(\"{t}\").expect(\"lexforge-generated regex is always valid\")),\n"
            )),
            None => s.push_str("        trailing: None,\n"),
        }
        s.push_str(&format!("        start_conds: {start_conds_lit},\n"));
        s.push_str(&format!("        wildcard: {wildcard},\n"));
        s.push_str(&format!("        sol_anchored: {},\n", rule.sol_anchored));
        s.push_str(&format!("        action: {action_src},\n"));
        s.push_str("    },\n");
    }

    s.push_str("]);\n\n");
    Ok(s)
}
