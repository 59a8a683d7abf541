//! Claim and locale line grammars.
//!
//! Claim declarations (top-level list items):
//!
//! ```text
//! `NAME` ["DISPLAY"] [(TYPE)] [:] DESCRIPTION [flag, key=value, ...]
//! ```
//!
//! Locale overrides (items of a list nested in a claim item):
//!
//! ```text
//! LOCALE: ["LABEL"] [- ]DESCRIPTION
//! ```
//!
//! Lines are split into tokens by a small lexer and consumed by a
//! recursive-descent parser. The description is taken verbatim from the
//! remaining input, then bracketed flag groups and legacy `(mandatory)`
//! markers are stripped from it.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use mtc_formats::{ClaimLocalization, ValueType};

const MANDATORY: &str = "mandatory";
const LEGACY_MANDATORY: &str = "(mandatory)";

/// A claim declaration parsed from a list item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimDef {
    /// Claim name as written (dotted for nested claims).
    pub name: String,
    pub display_name: Option<String>,
    pub value_type: ValueType,
    pub description: String,
    pub mandatory: bool,
    /// Selective disclosure policy, lower-cased.
    pub sd: Option<String>,
    pub svg_id: Option<String>,
    /// Per-format emitted names from `as.<format>=<name>` flags.
    pub format_names: BTreeMap<String, String>,
    /// Localized labels from nested locale items.
    pub localizations: BTreeMap<String, ClaimLocalization>,
}

impl ClaimDef {
    /// Serialize back into canonical claim grammar.
    ///
    /// Parsing the result yields an equal claim (localizations aside, which
    /// live in nested items).
    pub fn to_canonical(&self) -> String {
        let mut line = format!("`{}`", self.name);
        if let Some(display) = &self.display_name {
            let _ = write!(line, " \"{display}\"");
        }
        let _ = write!(line, " ({}):", self.value_type);
        if !self.description.is_empty() {
            line.push(' ');
            line.push_str(&self.description);
        }

        let mut flags: Vec<String> = Vec::new();
        if self.mandatory {
            flags.push(MANDATORY.to_owned());
        }
        if let Some(sd) = &self.sd {
            flags.push(format!("sd={sd}"));
        }
        if let Some(svg_id) = &self.svg_id {
            flags.push(format!("svg_id={svg_id}"));
        }
        for (format, name) in &self.format_names {
            flags.push(format!("as.{format}={name}"));
        }
        if !flags.is_empty() {
            let _ = write!(line, " [{}]", flags.join(", "));
        }
        line
    }
}

/// A per-locale override parsed from a nested list item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocaleOverride {
    pub locale: String,
    pub label: Option<String>,
    pub description: String,
}

/// Result of parsing one list item line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedLine {
    Claim(ClaimDef),
    Locale(LocaleOverride),
    NoMatch,
}

/// Parse a list item line.
///
/// Top-level items are parsed as claims, nested items as locale overrides.
pub fn parse_line(text: &str, nested: bool) -> ParsedLine {
    if nested {
        parse_locale(text).map_or(ParsedLine::NoMatch, ParsedLine::Locale)
    } else {
        parse_claim(text).map_or(ParsedLine::NoMatch, ParsedLine::Claim)
    }
}

/// Parse a claim declaration. Returns `None` unless the line starts with a
/// backtick-delimited, non-empty name.
pub fn parse_claim(text: &str) -> Option<ClaimDef> {
    let mut lexer = Lexer::new(text.trim_start());

    let Some(Token::Code(name)) = lexer.next_token() else {
        return None;
    };
    if name.is_empty() {
        return None;
    }

    let mut claim = ClaimDef {
        name: name.to_owned(),
        ..ClaimDef::default()
    };

    if let Some(Token::Quoted(display)) = lexer.peek() {
        lexer.next_token();
        claim.display_name = Some(display.to_owned()).filter(|d| !d.is_empty());
    }

    if let Some(Token::Group(group)) = lexer.peek() {
        lexer.next_token();
        let group = group.trim();
        if group.eq_ignore_ascii_case(MANDATORY) {
            claim.mandatory = true;
        } else {
            claim.value_type = ValueType::parse(group);
        }
    }

    if lexer.peek() == Some(Token::Colon) {
        lexer.next_token();
    }

    let description = strip_flag_groups(lexer.rest(), &mut claim);
    let description = strip_legacy_mandatory(&description, &mut claim);
    claim.description = description.trim().to_owned();

    Some(claim)
}

/// Parse a locale override line.
pub fn parse_locale(text: &str) -> Option<LocaleOverride> {
    let mut lexer = Lexer::new(text.trim_start());

    let Some(Token::Word(locale)) = lexer.next_token() else {
        return None;
    };
    if !is_locale_tag(locale) || !lexer.rest_raw().starts_with(':') {
        return None;
    }
    lexer.next_token();

    let mut label = None;
    if let Some(Token::Quoted(quoted)) = lexer.peek() {
        lexer.next_token();
        label = Some(quoted.to_owned()).filter(|l| !l.is_empty());
    }

    if lexer.peek() == Some(Token::Dash) {
        lexer.next_token();
    }

    Some(LocaleOverride {
        locale: locale.to_owned(),
        label,
        description: lexer.rest().trim().to_owned(),
    })
}

/// Check a locale tag: 2-3 ASCII letters, optionally `-` and 2-4 ASCII letters.
pub fn is_locale_tag(tag: &str) -> bool {
    let (language, region) = match tag.split_once('-') {
        Some((language, region)) => (language, Some(region)),
        None => (tag, None),
    };
    let letters = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphabetic())
    };
    letters(language, 2, 3) && region.is_none_or(|r| letters(r, 2, 4))
}

/// Remove every non-empty `[...]` group from the description, applying its
/// flags. A whitespace-only group is removed without setting anything.
fn strip_flag_groups(description: &str, claim: &mut ClaimDef) -> String {
    let mut out = String::with_capacity(description.len());
    let mut rest = description;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']').map(|i| open + i) else {
            break;
        };
        let content = &rest[open + 1..close];
        if content.is_empty() {
            out.push_str(&rest[..=close]);
        } else {
            out.push_str(&rest[..open]);
            for flag in content.split(',') {
                apply_flag(flag.trim(), claim);
            }
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

fn apply_flag(flag: &str, claim: &mut ClaimDef) {
    let (key, value) = match flag.split_once('=') {
        Some((key, value)) => (key.trim().to_ascii_lowercase(), Some(value.trim())),
        None => (flag.to_ascii_lowercase(), None),
    };

    match (key.as_str(), value) {
        (MANDATORY, None) => claim.mandatory = true,
        ("sd", Some(value)) if !value.is_empty() => {
            claim.sd = Some(value.to_ascii_lowercase());
        }
        ("svg_id", Some(value)) if !value.is_empty() => {
            claim.svg_id = Some(value.to_owned());
        }
        (key, Some(name)) if key.starts_with("as.") && !name.is_empty() => {
            let format = &key["as.".len()..];
            if !format.is_empty() {
                claim
                    .format_names
                    .insert(format.to_owned(), name.to_owned());
            }
        }
        _ => {}
    }
}

/// Remove legacy `(mandatory)` markers (any case), setting the flag.
fn strip_legacy_mandatory(description: &str, claim: &mut ClaimDef) -> String {
    let lower = description.to_ascii_lowercase();
    if !lower.contains(LEGACY_MANDATORY) {
        return description.to_owned();
    }
    claim.mandatory = true;

    let mut out = String::with_capacity(description.len());
    let mut last = 0;
    for (start, _) in lower.match_indices(LEGACY_MANDATORY) {
        out.push_str(&description[last..start]);
        last = start + LEGACY_MANDATORY.len();
    }
    out.push_str(&description[last..]);
    out
}

/// Lexical token of a claim or locale line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token<'a> {
    /// `` `text` ``
    Code(&'a str),
    /// `"text"`
    Quoted(&'a str),
    /// `(text)`
    Group(&'a str),
    Colon,
    Dash,
    /// Run of characters up to whitespace or a delimiter.
    Word(&'a str),
}

/// Tokenizer over a single line.
///
/// Delimited tokens (code, quoted, group) end at the first closing delimiter;
/// an unterminated delimiter is lexed as a word.
#[derive(Clone, Copy, Debug)]
struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<Token<'a>> {
        let mut lookahead = *self;
        lookahead.next_token()
    }

    /// Input after the last consumed token, leading whitespace removed.
    fn rest(&self) -> &'a str {
        self.rest_raw().trim_start()
    }

    /// Input after the last consumed token.
    fn rest_raw(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        let skipped = self.rest_raw().len() - self.rest().len();
        self.pos += skipped;

        let rest = self.rest_raw();
        let first = rest.chars().next()?;

        let delimited = match first {
            '`' => Some(('`', Token::Code as fn(&'a str) -> Token<'a>)),
            '"' => Some(('"', Token::Quoted as fn(&'a str) -> Token<'a>)),
            '(' => Some((')', Token::Group as fn(&'a str) -> Token<'a>)),
            _ => None,
        };
        if let Some((close, make)) = delimited
            && let Some(end) = rest[1..].find(close)
        {
            let inner = &rest[1..=end];
            self.pos += end + 2;
            return Some(make(inner));
        }

        match first {
            ':' => {
                self.pos += 1;
                Some(Token::Colon)
            }
            '-' => {
                self.pos += 1;
                Some(Token::Dash)
            }
            _ => {
                let len = rest
                    .char_indices()
                    .skip(1)
                    .find(|&(_, c)| c.is_whitespace() || matches!(c, '`' | '"' | '(' | ':'))
                    .map_or(rest.len(), |(i, _)| i);
                self.pos += len;
                Some(Token::Word(&rest[..len]))
            }
        }
    }
}
