use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use lemmatch_reference::{LoadMode, ReferenceSet};

fn main() -> Result<()> {
    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: cargo run -p lemmatch-reference --example stats -- <reference-file>")?;

    let set = ReferenceSet::from_path(&path, LoadMode::Mmap)
        .with_context(|| format!("loading reference data from {}", path.display()))?;

    let mut by_pos: BTreeMap<&str, usize> = BTreeMap::new();
    let mut morphemes = 0usize;
    for entry in set.entries() {
        *by_pos.entry(entry.pos_label()).or_insert(0) += 1;
        morphemes += entry.morpheme_count();
    }

    println!("Reference   : {}", path.display());
    println!("Format      : {} ({})", set.schema(), set.delimiter().label());
    println!("Entries     : {}", set.len());
    println!("Index keys  : {}", set.index().key_count());
    println!("Postings    : {}", set.index().posting_count());
    println!("Morphemes   : {}", morphemes);
    println!("Entries by POS:");
    for (pos, count) in by_pos {
        println!("  {:<12} {}", pos, count);
    }

    Ok(())
}
