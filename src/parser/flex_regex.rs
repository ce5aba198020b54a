//! The flex regular-expression translator (spec.md §4.2).
//!
//! Rewrites one flex-dialect rule line into a portable regex pattern plus
//! auxiliary metadata (trailing-context regex, start conditions, sol-anchor
//! flag). Grounded on `examples/original_source/regexp.go`'s `flexParser`
//! character-by-character sub-state machine, ported index-for-index from Go
//! byte offsets to Rust `char` offsets (`Vec<char>` rather than raw bytes, so
//! splices never land on a UTF-8 boundary by accident).

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{LexForgeError, Result};
use crate::model::StartCondSet;

/// Result of translating one rule line's pattern portion.
#[derive(Debug, Clone)]
pub struct FlexTranslation {
    pub start_conds: StartCondSet,
    pub pattern: String,
    pub trailing: Option<String>,
    pub sol_anchored: bool,
    /// Whitespace-trimmed remainder of the line (the action text).
    pub remainder: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegexParseState {
    Root,
    Class,
    Quotes,
    Subst,
}

/// Matches a `{N}` / `{N,}` / `{,M}` / `{N,M}` repetition-range body. Anchored
/// full-string (unlike the original's unanchored `FindStringSubmatch`, which
/// would trivially "match" any bogus name at an empty prefix) so that an
/// undefined, non-numeric substitution name is correctly rejected per
/// spec.md §4.2's "Unrecognized → fatal error 'no such name'" rule instead of
/// silently falling through to a degenerate zero-repetition.
static REPEAT_RANGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]*)(,)?([0-9]*)$").unwrap());

/// Translate one raw rule line into its pattern, trailing context, start
/// conditions and remainder (the action text).
pub fn translate_rule_line(
    file: &str,
    line_no: usize,
    raw_line: &str,
    substitutions: &IndexMap<String, String>,
) -> Result<FlexTranslation> {
    let (start_conds, rest) = split_start_conditions(raw_line);
    let mut line: Vec<char> = rest.chars().collect();

    let mut state = RegexParseState::Root;
    let mut q_start = 0usize;
    let mut tc_start: Option<usize> = None;
    let mut last_element: Option<usize> = None;
    let mut range_starts: Vec<usize> = Vec::new();

    let mut i = 0usize;
    loop {
        if i >= line.len() {
            break;
        }
        if line[i] == '\\' {
            i = (i + 2).min(line.len());
            continue;
        }

        match state {
            RegexParseState::Root => match line[i] {
                ' ' | '\t' => break,
                '[' => {
                    state = RegexParseState::Class;
                    last_element = Some(i);
                    i += 1;
                }
                '"' => {
                    state = RegexParseState::Quotes;
                    q_start = i;
                    i += 1;
                }
                '{' => {
                    state = RegexParseState::Subst;
                    q_start = i;
                    i += 1;
                }
                '/' => {
                    if tc_start.is_some() {
                        return Err(LexForgeError::Syntax(
                            file.to_string(),
                            line_no,
                            "multiple trailing contexts '/' in one pattern".into(),
                        ));
                    }
                    tc_start = Some(i);
                    i += 1;
                }
                '.' => {
                    let repl: Vec<char> = "[^\\n]".chars().collect();
                    let repl_len = repl.len();
                    line.splice(i..i + 1, repl);
                    last_element = Some(i);
                    i += repl_len;
                }
                '^' if i != 0 => {
                    line.splice(i..i + 1, ['\\', '^']);
                    last_element = Some(i);
                    i += 2;
                }
                '^' => {
                    // Start-of-line anchor at the very start of the pattern:
                    // left untouched, not recorded as "last element".
                    i += 1;
                }
                '$' => {
                    if tc_start.is_some() {
                        return Err(LexForgeError::Syntax(
                            file.to_string(),
                            line_no,
                            "unescaped '$' in pattern found after trailing context '/'".into(),
                        ));
                    }
                    let at_end_or_before_ws = i == line.len() - 1
                        || matches!(line.get(i + 1), Some(' ') | Some('\t'));
                    if !at_end_or_before_ws {
                        line.splice(i..i + 1, ['\\', '$']);
                        i += 2;
                    } else {
                        tc_start = Some(i);
                        line.splice(i..i + 1, ['/', '\\', 'n', '|', '$']);
                        i += 5;
                    }
                }
                '(' => {
                    if line.get(i + 1) == Some(&'?') && line.get(i + 2) == Some(&'#') {
                        let close = line[i..].iter().position(|&c| c == ')').ok_or_else(|| {
                            LexForgeError::Syntax(
                                file.to_string(),
                                line_no,
                                "unterminated regex comment '(?#...)'".into(),
                            )
                        })?;
                        line.splice(i..i + close + 1, std::iter::empty());
                        // i is left unchanged: whatever followed the comment
                        // now sits at i and must still be scanned.
                    } else {
                        range_starts.push(i);
                        i += 1;
                    }
                }
                ')' => {
                    let open = range_starts.pop().ok_or_else(|| {
                        LexForgeError::Syntax(
                            file.to_string(),
                            line_no,
                            "unmatched ')' in pattern".into(),
                        )
                    })?;
                    last_element = Some(open);
                    i += 1;
                }
                _ => {
                    last_element = Some(i);
                    i += 1;
                }
            },
            RegexParseState::Class => {
                if line[i] == ']' {
                    state = RegexParseState::Root;
                }
                i += 1;
            }
            RegexParseState::Quotes => {
                if line[i] == '"' {
                    let orig_quoted: String = line[q_start + 1..i].iter().collect();
                    let unescaped = orig_quoted.replace("\\\"", "\"");
                    let quoted = regex::escape(&unescaped);
                    let quoted_chars: Vec<char> = quoted.chars().collect();
                    let new_i = q_start + quoted_chars.len();
                    line.splice(q_start..i + 1, quoted_chars);
                    state = RegexParseState::Root;
                    i = new_i;
                } else {
                    i += 1;
                }
            }
            RegexParseState::Subst => {
                if line[i] == '}' {
                    let name: String = line[q_start + 1..i].iter().collect();
                    let replacement = resolve_subst(
                        file,
                        line_no,
                        &name,
                        substitutions,
                        &line,
                        last_element,
                        q_start,
                    )?;
                    let replacement_chars: Vec<char> = replacement.chars().collect();
                    let new_i = q_start + replacement_chars.len();
                    line.splice(q_start..i + 1, replacement_chars);
                    state = RegexParseState::Root;
                    i = new_i;
                } else {
                    i += 1;
                }
            }
        }
    }

    if state != RegexParseState::Root {
        return Err(LexForgeError::Syntax(
            file.to_string(),
            line_no,
            "unterminated character class, quoted literal or substitution in pattern".into(),
        ));
    }

    let (pattern_chars, trailing): (Vec<char>, Option<String>) = match tc_start {
        Some(k) => (
            line[..k].to_vec(),
            Some(line[k + 1..i].iter().collect::<String>()),
        ),
        None => (line[..i].to_vec(), None),
    };
    let sol_anchored = pattern_chars.first() == Some(&'^');
    let pattern: String = pattern_chars.into_iter().collect();
    let remainder: String = line[i..].iter().collect::<String>().trim().to_string();

    Ok(FlexTranslation {
        start_conds,
        pattern,
        trailing,
        sol_anchored,
        remainder,
    })
}

/// Split a leading `<sc1,sc2,...>` (or `<*>`) prefix off a rule line.
fn split_start_conditions(raw_line: &str) -> (StartCondSet, &str) {
    if let Some(rest) = raw_line.strip_prefix('<') {
        if let Some(close) = rest.find('>') {
            let inner = &rest[..close];
            let after = &rest[close + 1..];
            let set = if inner == "*" {
                StartCondSet::Wildcard
            } else {
                StartCondSet::Named(inner.split(',').map(|s| s.to_string()).collect())
            };
            return (set, after);
        }
    }
    (StartCondSet::AnyInclusive, raw_line)
}

/// Resolve a `{NAME}` splice: either a defined substitution or a repetition
/// range over the preceding "last element" span.
fn resolve_subst(
    file: &str,
    line_no: usize,
    name: &str,
    substitutions: &IndexMap<String, String>,
    line: &[char],
    last_element: Option<usize>,
    q_start: usize,
) -> Result<String> {
    if let Some(repl) = substitutions.get(name) {
        return Ok(format!("({repl})"));
    }

    let caps = if name.is_empty() {
        None
    } else {
        REPEAT_RANGE_RE.captures(name)
    };
    let caps = caps.ok_or_else(|| {
        LexForgeError::UndefinedReference(file.to_string(), line_no, name.to_string())
    })?;

    let last = last_element.ok_or_else(|| {
        LexForgeError::Syntax(
            file.to_string(),
            line_no,
            format!("repetition '{{{name}}}' with no preceding pattern element"),
        )
    })?;
    let x: String = line[last..q_start].iter().collect();

    let g1 = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let g3 = caps.get(3).map(|m| m.as_str()).unwrap_or("");
    let has_comma = caps.get(2).is_some();

    if !has_comma {
        let reps_str = format!("{g1}{g3}");
        if reps_str.is_empty() {
            return Err(LexForgeError::UndefinedReference(
                file.to_string(),
                line_no,
                name.to_string(),
            ));
        }
        let reps: u32 = reps_str.parse().map_err(|_| {
            LexForgeError::UndefinedReference(file.to_string(), line_no, name.to_string())
        })?;
        if reps == 0 {
            return Err(LexForgeError::MalformedRepetition(
                file.to_string(),
                line_no,
                0,
                0,
            ));
        }
        return Ok(x.repeat((reps - 1) as usize));
    }

    let min: u32 = if g1.is_empty() { 0 } else { g1.parse().unwrap_or(0) };
    let max: Option<u32> = if g3.is_empty() {
        None
    } else {
        Some(g3.parse().unwrap_or(0))
    };

    let mut app = String::new();
    match max {
        None if min == 0 => app.push('*'),
        None if min == 1 => app.push('+'),
        None => {
            for _ in 1..min {
                app.push_str(&x);
            }
            app.push('+');
        }
        Some(max_v) => {
            if max_v < min {
                return Err(LexForgeError::MalformedRepetition(
                    file.to_string(),
                    line_no,
                    min as i64,
                    max_v as i64,
                ));
            }
            let mut max_v = max_v;
            if min == 0 {
                app.push('?');
                max_v = max_v.saturating_sub(1);
            }
            for _ in 1..min {
                app.push_str(&x);
            }
            for _ in min..max_v {
                app.push('(');
                app.push_str(&x);
                app.push_str(")?");
            }
        }
    }

    Ok(app)
}
