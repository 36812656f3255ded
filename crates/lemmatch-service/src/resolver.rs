use std::collections::HashSet;

use lemmatch_reference::{ReferenceSet, normalize_form};
use lemmatch_translit::{contains_georgian, generate_variants};
use lemmatch_types::{Match, ReferenceEntry};
use tracing::trace;

/// Find the reference rows for one query word.
///
/// The query is lowercased and trimmed and looked up as-is first. Only when
/// that finds nothing and the query contains Georgian letters are the Latin
/// transliteration variants tried, in generation order, each hit tagged with
/// the variant that found it. The combined hits keep the first row seen for
/// each lemma. No match is an empty vector, never an error.
pub fn resolve(query: &str, reference: &ReferenceSet) -> Vec<Match> {
    let normalized = normalize_form(query);
    let mut hits: Vec<(&ReferenceEntry, Option<String>)> = reference
        .lookup(&normalized)
        .map(|entry| (entry, None))
        .collect();

    if hits.is_empty() && contains_georgian(&normalized) {
        for variant in generate_variants(&normalized) {
            let before = hits.len();
            hits.extend(
                reference
                    .lookup(&variant.text)
                    .map(|entry| (entry, Some(variant.text.clone()))),
            );
            if hits.len() > before {
                trace!(query, variant = %variant.text, rule = ?variant.rule, "variant hit");
            }
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    hits.into_iter()
        .filter(|(entry, _)| seen.insert(entry.lemma.as_str()))
        .map(|(entry, variant)| Match {
            entry: entry.clone(),
            variant,
        })
        .collect()
}
