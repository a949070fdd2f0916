//! Sentence parser turning a spoken or typed price line into a [`CaptureItem`].
//!
//! The accepted shape is
//!
//! ```text
//! <brand><product> <number><unit> <dash> [currency]<number>
//! ```
//!
//! e.g. `"喜旺手掰肉老火腿340g — 19.90"`. Input is split into tokens by a
//! small hand-written scanner and matched against that grammar; there is no
//! regular expression involved. The recognized units and the brand lexicon
//! used to split an unbroken CJK name live in [`Vocabulary`], so supporting a
//! new unit is a data change.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::item::CaptureItem;

/// Units recognized when no catalog overrides them.
pub const DEFAULT_UNITS: &[&str] = &["g", "gr", "gram", "grams", "kg", "克", "千克"];

/// Brands used to split a name that has no boundary between brand and product.
pub const DEFAULT_BRANDS: &[&str] = &["喜旺", "双汇", "金锣", "雨润", "得利斯"];

const DASHES: &[char] = &['-', '—', '–', '―', '－', '‐', '‑', '‒'];
const CURRENCY_MARKS: &[char] = &['¥', '￥', '$'];

/// Result of a single parse. Not matching is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Matched(CaptureItem),
    Unmatched,
}

impl ParseOutcome {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, ParseOutcome::Matched(_))
    }

    #[must_use]
    pub fn into_item(self) -> Option<CaptureItem> {
        match self {
            ParseOutcome::Matched(item) => Some(item),
            ParseOutcome::Unmatched => None,
        }
    }
}

/// Unit tokens and brand lexicon consulted by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// Lowercased unit tokens.
    units: Vec<String>,
    brands: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(
            DEFAULT_UNITS.iter().copied(),
            DEFAULT_BRANDS.iter().copied(),
        )
    }
}

impl Vocabulary {
    pub fn new<U, B>(units: U, brands: B) -> Self
    where
        U: IntoIterator,
        U::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        let mut vocabulary = Self {
            units: Vec::new(),
            brands: Vec::new(),
        };
        vocabulary.extend_units(units);
        vocabulary.extend_brands(brands);
        vocabulary
    }

    /// Adds unit tokens, ignoring blanks and duplicates.
    pub fn extend_units<U>(&mut self, units: U)
    where
        U: IntoIterator,
        U::Item: AsRef<str>,
    {
        for unit in units {
            let unit = unit.as_ref().trim().to_lowercase();
            if !unit.is_empty() && !self.units.contains(&unit) {
                self.units.push(unit);
            }
        }
    }

    /// Adds brand names, ignoring blanks and duplicates.
    pub fn extend_brands<B>(&mut self, brands: B)
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        for brand in brands {
            let brand = brand.as_ref().trim();
            if !brand.is_empty() && !self.brands.iter().any(|b| b == brand) {
                self.brands.push(brand.to_owned());
            }
        }
    }

    #[must_use]
    pub fn units(&self) -> &[String] {
        &self.units
    }

    #[must_use]
    pub fn brands(&self) -> &[String] {
        &self.brands
    }

    fn is_unit(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        self.units.iter().any(|u| *u == lower)
    }

    /// Longest lexicon brand that is a proper prefix of `word`, ASCII
    /// case-insensitive. Returns the prefix length in bytes.
    fn brand_prefix_len(&self, word: &str) -> Option<usize> {
        self.brands
            .iter()
            .filter(|brand| brand.len() < word.len())
            .filter(|brand| {
                word.get(..brand.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(brand))
            })
            .map(String::len)
            .max()
    }
}

/// Parses price sentences against a [`Vocabulary`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceParser {
    vocabulary: Vocabulary,
}

impl SentenceParser {
    #[must_use]
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Parses the first price sentence found in `text`.
    ///
    /// Only one item is ever returned; callers holding several sentences
    /// parse them one line at a time.
    #[must_use]
    pub fn parse(&self, text: &str) -> ParseOutcome {
        let tokens = tokenize(text);

        tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.kind == TokenKind::Number)
            .find_map(|(idx, _)| self.match_at(text, &tokens, idx))
            .map_or(ParseOutcome::Unmatched, ParseOutcome::Matched)
    }

    /// Tries to match the grammar with the size number at `tokens[size_idx]`.
    fn match_at(&self, text: &str, tokens: &[Token], size_idx: usize) -> Option<CaptureItem> {
        let size = tokens[size_idx];
        let unit = tokens.get(size_idx + 1)?;
        if !matches!(unit.kind, TokenKind::Word(_)) || !self.vocabulary.is_unit(unit.slice(text))
        {
            return None;
        }

        if tokens.get(size_idx + 2)?.kind != TokenKind::Dash {
            return None;
        }

        let mut price_idx = size_idx + 3;
        if tokens.get(price_idx)?.kind == TokenKind::Currency {
            price_idx += 1;
        }
        let price_token = tokens.get(price_idx)?;
        if price_token.kind != TokenKind::Number {
            return None;
        }
        let price = Decimal::from_str(price_token.slice(text)).ok()?;

        let first_word = tokens[..size_idx]
            .iter()
            .rposition(|t| !matches!(t.kind, TokenKind::Word(_)))
            .map_or(0, |pos| pos + 1);
        let words = &tokens[first_word..size_idx];
        let (brand, product_name) = self.split_name(text, words)?;

        let specifications = &text[size.start..unit.end];

        CaptureItem::new(brand, product_name, specifications, price).ok()
    }

    /// Splits the name words preceding the size into brand and product.
    ///
    /// Several words: the first is the brand, the rest the product. A single
    /// word is only split when it starts with a known brand.
    fn split_name<'t>(&self, text: &'t str, words: &[Token]) -> Option<(&'t str, &'t str)> {
        match words {
            [] => None,
            [only] => {
                let word = only.slice(text);
                let brand_len = self.vocabulary.brand_prefix_len(word)?;
                Some((&word[..brand_len], &word[brand_len..]))
            }
            [first, rest @ ..] => {
                let last = rest.last()?;
                Some((first.slice(text), &text[rest[0].start..last.end]))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Cjk,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    /// Maximal run of letters from one script.
    Word(Script),
    /// ASCII digits with an optional fractional part.
    Number,
    /// One or more dash characters.
    Dash,
    Currency,
    Other,
}

/// Byte span into the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

impl Token {
    fn slice<'t>(&self, text: &'t str) -> &'t str {
        &text[self.start..self.end]
    }
}

fn script_of(c: char) -> Script {
    if matches!(c,
        '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
    {
        Script::Cjk
    } else {
        Script::Other
    }
}

/// Splits `text` into tokens; whitespace separates tokens and is dropped.
fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let end_of = |idx: usize| chars.get(idx).map_or(text.len(), |&(pos, _)| pos);

    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let (start, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let kind = if c.is_ascii_digit() {
            while i < chars.len() && chars[i].1.is_ascii_digit() {
                i += 1;
            }
            let has_fraction = i + 1 < chars.len()
                && chars[i].1 == '.'
                && chars[i + 1].1.is_ascii_digit();
            if has_fraction {
                i += 1;
                while i < chars.len() && chars[i].1.is_ascii_digit() {
                    i += 1;
                }
            }
            TokenKind::Number
        } else if c.is_alphabetic() {
            let script = script_of(c);
            while i < chars.len() && chars[i].1.is_alphabetic() && script_of(chars[i].1) == script
            {
                i += 1;
            }
            TokenKind::Word(script)
        } else if DASHES.contains(&c) {
            while i < chars.len() && DASHES.contains(&chars[i].1) {
                i += 1;
            }
            TokenKind::Dash
        } else if CURRENCY_MARKS.contains(&c) {
            i += 1;
            TokenKind::Currency
        } else {
            i += 1;
            TokenKind::Other
        };

        tokens.push(Token {
            kind,
            start,
            end: end_of(i),
        });
    }

    tokens
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
