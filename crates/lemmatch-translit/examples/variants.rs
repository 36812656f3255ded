use std::env;

use anyhow::{Result, bail};
use lemmatch_translit::{contains_georgian, generate_variants};

fn main() -> Result<()> {
    let words: Vec<String> = env::args().skip(1).collect();
    if words.is_empty() {
        bail!("usage: cargo run -p lemmatch-translit --example variants -- <word>...");
    }

    for word in words {
        println!("\nWord: {}", word);
        if !contains_georgian(&word) {
            println!("  (no Georgian letters; a lookup would only try the exact form)");
        }
        for variant in generate_variants(&word) {
            println!("  {:<16} [{:?}]", variant.text, variant.rule);
        }
    }

    Ok(())
}
