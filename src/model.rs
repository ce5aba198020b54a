//! The intermediate model populated by the lex-source parser and consumed by
//! the emitter. See spec.md §3.

use indexmap::IndexMap;

/// The id space for user-declared start conditions starts here; `INITIAL` is
/// the only condition below it, fixed at 0.
pub const FIRST_START_CONDITION_ID: u32 = 1024;
pub const INITIAL_START_CONDITION_ID: u32 = 0;
pub const INITIAL_START_CONDITION_NAME: &str = "INITIAL";

/// A named scanner mode. Inclusive (`%s`) conditions also admit rules with no
/// start-condition prefix; exclusive (`%x`) conditions admit only rules that
/// name them (or the wildcard `*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartCondition {
    pub id: u32,
    pub exclusive: bool,
}

/// Which start conditions a rule is active under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartCondSet {
    /// No `<...>` prefix: active in every inclusive condition.
    AnyInclusive,
    /// `<*>` prefix: active in every condition, inclusive or exclusive.
    Wildcard,
    /// `<sc1,sc2,...>` prefix: active only under the named conditions.
    Named(Vec<String>),
}

impl StartCondSet {
    pub fn is_empty_prefix(&self) -> bool {
        matches!(self, StartCondSet::AnyInclusive)
    }
}

/// One scanner rule (spec.md §3 LexRule).
#[derive(Debug, Clone)]
pub struct LexRule {
    pub start_conds: StartCondSet,
    /// Portable (POSIX-ish) regex pattern text, pre-translation-quoting.
    pub pattern: String,
    /// Trailing-context regex (`r1/r2`'s `r2`), if any.
    pub trailing: Option<String>,
    /// True when the original flex pattern began with `^`.
    pub sol_anchored: bool,
    /// Target-language (Rust) action source. `"|"` rules are resolved before
    /// this field is ever read by the emitter — see invariant (a).
    pub action: String,
    /// The 1-based source line the rule pattern was declared on, for
    /// diagnostics.
    pub line: usize,
}

/// The parsed `.l` source (spec.md §3 LexFile).
#[derive(Debug, Clone, Default)]
pub struct LexFile {
    /// Verbatim `%{ ... %}` prologue-literal text, preamble/imports for the
    /// emitted scanner.
    pub preamble: String,
    /// Indented prologue lines outside `%{...%}`, run once at scanner start.
    pub prologue_code: Vec<String>,
    /// Named pattern-fragment substitutions, declaration order preserved.
    pub substitutions: IndexMap<String, String>,
    /// Start-condition declarations, declaration order preserved.
    pub start_conditions: IndexMap<String, StartCondition>,
    /// Rules in source order; this order is the tie-breaker for equal-length
    /// matches at scan time.
    pub rules: Vec<LexRule>,
    /// Verbatim trailer code after the second `%%`.
    pub epilogue: String,
}

impl LexFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next start-condition id (declaration order, starting at
    /// `FIRST_START_CONDITION_ID`).
    pub fn next_start_condition_id(&self) -> u32 {
        FIRST_START_CONDITION_ID + self.start_conditions.len() as u32
    }

    pub fn declare_start_condition(&mut self, name: &str, exclusive: bool) {
        if self.start_conditions.contains_key(name) {
            return;
        }
        let id = self.next_start_condition_id();
        self.start_conditions
            .insert(name.to_string(), StartCondition { id, exclusive });
    }

    pub fn is_exclusive(&self, name: &str) -> bool {
        self.start_conditions
            .get(name)
            .map(|sc| sc.exclusive)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_condition_ids_assigned_in_order() {
        let mut lf = LexFile::new();
        lf.declare_start_condition("STR", true);
        lf.declare_start_condition("COMMENT", true);

        assert_eq!(lf.start_conditions["STR"].id, 1024);
        assert_eq!(lf.start_conditions["COMMENT"].id, 1025);
        assert!(lf.start_conditions["STR"].exclusive);
    }

    #[test]
    fn redeclaring_a_start_condition_is_a_no_op() {
        let mut lf = LexFile::new();
        lf.declare_start_condition("STR", true);
        lf.declare_start_condition("STR", false);
        assert!(lf.start_conditions["STR"].exclusive);
    }
}
