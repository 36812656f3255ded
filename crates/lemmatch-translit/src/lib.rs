//! Georgian-to-Latin transliteration and lookup-variant generation.
//!
//! Latin spellings of Georgian words are inconsistent: ejective consonants are
//! sometimes marked with an apostrophe (`k'`), sometimes not, and the
//! affricates `ც`/`წ`/`ჩ`/`ჭ` show up as `c`, `ts`, `ch` and friends. Rather
//! than model the phonology, this crate enumerates the plausible spellings of a
//! word so a caller can look each one up in an index.
//!
//! # How it works
//! 1. Lowercase the word and map every character through a fixed table
//!    (characters outside the table pass through unchanged).
//! 2. Add the ejective-marked and ejective-stripped spellings.
//! 3. Add the affricate substitutions (`c`→`ts`, `c`→`ts'`, `ch`→`c`, `ch`→`ch'`).
//! 4. Drop empty strings and duplicates, keeping first-produced order and the
//!    rule that produced each spelling.
//!
//! Generation over-produces on purpose; callers deduplicate whatever the
//! variants resolve to.
//!
//! # Example
//! ```
//! use lemmatch_translit::{VariantRule, generate_variants, transliterate};
//!
//! assert_eq!(transliterate("ორი"), "ori");
//!
//! let variants = generate_variants("კაცი");
//! assert_eq!(variants[0].text, "kaci");
//! assert_eq!(variants[0].rule, VariantRule::Base);
//! assert!(variants.iter().any(|v| v.text == "katsi"));
//! ```
//!
//! For a runnable demo, see `cargo run -p lemmatch-translit --example variants -- <word>...`.

use std::borrow::Cow;
use std::collections::HashSet;

/// Consonants whose ejective form is written with a trailing apostrophe.
pub const EJECTIVES: [char; 4] = ['k', 't', 'p', 'q'];

/// Whole-string substitutions applied to the base transliteration.
const AFFRICATES: [(&str, &str); 4] = [("c", "ts"), ("c", "ts'"), ("ch", "c"), ("ch", "ch'")];

/// Which rule produced a variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VariantRule {
    Base,
    EjectiveMarked,
    EjectiveStripped,
    Affricate {
        from: &'static str,
        to: &'static str,
    },
}

/// A candidate Latin spelling paired with its provenance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variant {
    pub text: String,
    pub rule: VariantRule,
}

/// Latin spelling of a Mkhedruli letter, if the table covers it.
pub fn latin_for(c: char) -> Option<&'static str> {
    let latin = match c {
        'ა' => "a",
        'ბ' => "b",
        'გ' => "g",
        'დ' => "d",
        'ე' => "e",
        'ვ' => "v",
        'ზ' => "z",
        'თ' => "t",
        'ი' => "i",
        'კ' => "k",
        'ლ' => "l",
        'მ' => "m",
        'ნ' => "n",
        'ო' => "o",
        'პ' => "p",
        'ჟ' => "zh",
        'რ' => "r",
        'ს' => "s",
        'ტ' => "t",
        'უ' => "u",
        'ფ' => "f",
        'ქ' => "k",
        'ღ' => "gh",
        'ყ' => "q",
        'შ' => "sh",
        'ჩ' => "ch",
        'ც' => "c",
        'ძ' => "dz",
        'წ' => "c",
        'ჭ' => "ch",
        'ხ' => "x",
        'ჯ' => "j",
        'ჰ' => "h",
        _ => return None,
    };
    Some(latin)
}

/// Map one character; anything outside the table maps to itself.
pub fn map_char(c: char) -> Cow<'static, str> {
    match latin_for(c) {
        Some(latin) => Cow::Borrowed(latin),
        None => Cow::Owned(c.to_string()),
    }
}

/// Lowercase `word` and transliterate it character by character.
pub fn transliterate(word: &str) -> String {
    let lowered = word.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match latin_for(c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

/// True if any character falls in the Georgian block (U+10A0..=U+10FF).
pub fn contains_georgian(text: &str) -> bool {
    text.chars().any(|c| ('\u{10A0}'..='\u{10FF}').contains(&c))
}

/// Enumerate distinct, non-empty Latin spellings of `word` in production order.
pub fn generate_variants(word: &str) -> Vec<Variant> {
    let base = transliterate(word);
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<Variant> = Vec::new();

    push_unique(&mut out, &mut seen, base.clone(), VariantRule::Base);
    push_unique(
        &mut out,
        &mut seen,
        mark_ejectives(&base),
        VariantRule::EjectiveMarked,
    );
    push_unique(
        &mut out,
        &mut seen,
        strip_ejectives(&base),
        VariantRule::EjectiveStripped,
    );
    for (from, to) in AFFRICATES {
        push_unique(
            &mut out,
            &mut seen,
            base.replace(from, to),
            VariantRule::Affricate { from, to },
        );
    }

    out
}

/// Variant spellings without provenance.
pub fn variant_strings(word: &str) -> Vec<String> {
    generate_variants(word)
        .into_iter()
        .map(|variant| variant.text)
        .collect()
}

fn push_unique(out: &mut Vec<Variant>, seen: &mut HashSet<String>, text: String, rule: VariantRule) {
    if text.is_empty() {
        return;
    }
    if seen.insert(text.clone()) {
        out.push(Variant { text, rule });
    }
}

fn mark_ejectives(base: &str) -> String {
    let mut out = String::with_capacity(base.len() + 4);
    for c in base.chars() {
        out.push(c);
        if EJECTIVES.contains(&c) {
            out.push('\'');
        }
    }
    out
}

// Removes at most one apostrophe after each ejective consonant.
fn strip_ejectives(base: &str) -> String {
    let mut out = String::with_capacity(base.len());
    let mut chars = base.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if EJECTIVES.contains(&c) && chars.peek() == Some(&'\'') {
            chars.next();
        }
    }
    out
}
