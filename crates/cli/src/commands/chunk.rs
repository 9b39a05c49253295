//! `parley chunk`: print the chunks of a file.

use std::path::Path;

use anyhow::Context;
use parley_agent::Chunker;
use parley_agent::extract::{MIME_TEXT, content_type_for_path, extract_text};
use parley_config::AppConfig;

pub fn run(
    config: &AppConfig,
    path: &Path,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let chunker = Chunker::new(
        chunk_size.unwrap_or(config.context.chunk_size),
        overlap.unwrap_or(config.context.chunk_overlap),
    )?;

    // Unknown extensions are read as plain text.
    let content_type = content_type_for_path(path).unwrap_or(MIME_TEXT);
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = extract_text(&bytes, content_type)?;
    let chunks = chunker.chunk(&text);

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    println!(
        "{} chunk(s) (size {}, overlap {})",
        chunks.len(),
        chunker.chunk_size(),
        chunker.overlap()
    );
    for chunk in &chunks {
        println!();
        println!(
            "── {} (words {}..{}, {} words)",
            chunk.chunk_id, chunk.start_word, chunk.end_word, chunk.word_count
        );
        println!("{}", chunk.text);
    }
    Ok(())
}
