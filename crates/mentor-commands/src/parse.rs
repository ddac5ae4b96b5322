//! Argument binding against a command's typed slots.
//!
//! Double-quoted runs stay one token; a trailing `Rest` slot swallows
//! whatever tokens are left.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// One bare token.
    Word,
    /// Integer with inclusive bounds.
    Int { min: i64, max: i64 },
    /// User mention (`<@id>`, `<@!id>`) or a raw id.
    Member,
    /// Remainder of the message, joined by single spaces. Must be last.
    Rest,
}

#[derive(Debug, Clone)]
pub struct ArgSlot {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
}

impl ArgSlot {
    pub fn word(name: &'static str) -> Self {
        Self { name, kind: ArgKind::Word, required: true }
    }

    pub fn opt_word(name: &'static str) -> Self {
        Self { name, kind: ArgKind::Word, required: false }
    }

    pub fn int(name: &'static str, min: i64, max: i64) -> Self {
        Self { name, kind: ArgKind::Int { min, max }, required: true }
    }

    pub fn member(name: &'static str) -> Self {
        Self { name, kind: ArgKind::Member, required: true }
    }

    pub fn opt_member(name: &'static str) -> Self {
        Self { name, kind: ArgKind::Member, required: false }
    }

    pub fn rest(name: &'static str) -> Self {
        Self { name, kind: ArgKind::Rest, required: true }
    }

    pub fn opt_rest(name: &'static str) -> Self {
        Self { name, kind: ArgKind::Rest, required: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Word(String),
    Int(i64),
    Member(u64),
    Rest(String),
}

/// Bound arguments, keyed by slot name.
#[derive(Debug, Default, Clone)]
pub struct ParsedArgs {
    values: HashMap<&'static str, ArgValue>,
}

impl ParsedArgs {
    pub fn word(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Word(w)) => Some(w),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn member(&self, name: &str) -> Option<u64> {
        match self.values.get(name) {
            Some(ArgValue::Member(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn rest(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Rest(r)) => Some(r),
            _ => None,
        }
    }
}

/// Bind `input` (everything after the verb) to `slots`.
/// Errors carry a human-readable reason; the dispatcher wraps them with the
/// command's usage line.
pub fn bind(slots: &[ArgSlot], input: &str) -> Result<ParsedArgs, String> {
    let tokens = tokenize(input);
    let mut values = HashMap::new();
    let mut pos = 0usize;

    for (i, slot) in slots.iter().enumerate() {
        match slot.kind {
            ArgKind::Rest => {
                debug_assert!(i == slots.len() - 1, "Rest slot must be last");
                let remainder = tokens[pos.min(tokens.len())..].join(" ");
                if remainder.is_empty() {
                    if slot.required {
                        return Err(format!("missing <{}>", slot.name));
                    }
                } else {
                    values.insert(slot.name, ArgValue::Rest(remainder));
                }
                pos = tokens.len();
            }
            _ => {
                let Some(token) = tokens.get(pos) else {
                    if slot.required {
                        return Err(format!("missing <{}>", slot.name));
                    }
                    continue;
                };
                let value = bind_token(slot, token)?;
                values.insert(slot.name, value);
                pos += 1;
            }
        }
    }

    if pos < tokens.len() {
        return Err(format!("unexpected argument `{}`", tokens[pos]));
    }

    Ok(ParsedArgs { values })
}

fn bind_token(slot: &ArgSlot, token: &str) -> Result<ArgValue, String> {
    match slot.kind {
        ArgKind::Word => Ok(ArgValue::Word(token.to_string())),
        ArgKind::Int { min, max } => {
            let n: i64 = token
                .parse()
                .map_err(|_| format!("<{}> must be a number", slot.name))?;
            if n < min || n > max {
                return Err(format!("<{}> must be between {min} and {max}", slot.name));
            }
            Ok(ArgValue::Int(n))
        }
        ArgKind::Member => parse_member(token)
            .map(ArgValue::Member)
            .ok_or_else(|| format!("<{}> must be a user mention", slot.name)),
        ArgKind::Rest => unreachable!("Rest is handled by bind()"),
    }
}

/// Accepts `<@123>`, `<@!123>`, or `123`.
fn parse_member(token: &str) -> Option<u64> {
    let inner = token
        .strip_prefix("<@!")
        .or_else(|| token.strip_prefix("<@"))
        .map(|s| s.strip_suffix('>').unwrap_or(s))
        .unwrap_or(token);
    inner.parse().ok()
}

/// Whitespace tokenizer that keeps double-quoted runs intact.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                if !in_quotes && !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Render the usage line for a slot list, e.g. `!11 <subject> [topic]`.
pub fn usage_line(prefix: &str, verb: &str, slots: &[ArgSlot]) -> String {
    let mut out = format!("{prefix}{verb}");
    for slot in slots {
        if slot.required {
            out.push_str(&format!(" <{}>", slot.name));
        } else {
            out.push_str(&format!(" [{}]", slot.name));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_words_and_rest() {
        let slots = [ArgSlot::word("subject"), ArgSlot::opt_rest("topic")];
        let args = bind(&slots, "physics waves and optics").unwrap();
        assert_eq!(args.word("subject"), Some("physics"));
        assert_eq!(args.rest("topic"), Some("waves and optics"));
    }

    #[test]
    fn optional_slots_may_be_absent() {
        let slots = [ArgSlot::word("subject"), ArgSlot::opt_rest("topic")];
        let args = bind(&slots, "chemistry").unwrap();
        assert_eq!(args.word("subject"), Some("chemistry"));
        assert_eq!(args.rest("topic"), None);
    }

    #[test]
    fn missing_required_slot_errors() {
        let slots = [ArgSlot::word("subject")];
        assert!(bind(&slots, "").is_err());
    }

    #[test]
    fn quoted_strings_stay_whole() {
        let slots = [ArgSlot::word("name"), ArgSlot::opt_rest("msg")];
        let args = bind(&slots, "\"organic chemistry\" is hard").unwrap();
        assert_eq!(args.word("name"), Some("organic chemistry"));
        assert_eq!(args.rest("msg"), Some("is hard"));
    }

    #[test]
    fn int_bounds_are_enforced() {
        let slots = [ArgSlot::int("n", 1, 100)];
        assert_eq!(bind(&slots, "42").unwrap().int("n"), Some(42));
        assert!(bind(&slots, "0").is_err());
        assert!(bind(&slots, "101").is_err());
        assert!(bind(&slots, "many").is_err());
    }

    #[test]
    fn member_mention_forms() {
        let slots = [ArgSlot::member("user")];
        assert_eq!(bind(&slots, "<@123>").unwrap().member("user"), Some(123));
        assert_eq!(bind(&slots, "<@!456>").unwrap().member("user"), Some(456));
        assert_eq!(bind(&slots, "789").unwrap().member("user"), Some(789));
        assert!(bind(&slots, "@nobody").is_err());
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let slots = [ArgSlot::word("subject")];
        assert!(bind(&slots, "physics extra").is_err());
    }

    #[test]
    fn usage_line_format() {
        let slots = [ArgSlot::word("subject"), ArgSlot::opt_rest("topic")];
        assert_eq!(usage_line("!", "11", &slots), "!11 <subject> [topic]");
    }
}
