use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::extract::Extractor;
use crate::models::ChapterData;

pub const TEXT_PREVIEW_CHARS: usize = 200;
pub const IMAGE_PREVIEW_CHARS: usize = 50;

/// Extract `url`, save it to `output` and print a preview.
///
/// The file is written only when extraction succeeds.
pub async fn run(extractor: &Extractor, url: &str, output: &Path) -> anyhow::Result<ChapterData> {
    println!("Fetching: {url}");

    let result = extractor.extract(url).await;
    if !result.success {
        anyhow::bail!(result.error_message.unwrap_or_default());
    }

    println!("Extracted {} paragraphs", result.paragraph_count);
    if !result.image_url.is_empty() {
        println!("Found image: {}...", preview(&result.image_url, IMAGE_PREVIEW_CHARS));
    }

    let data = ChapterData::from_result(url, &result);
    write_chapter_data(output, &data)?;
    tracing::info!(path = %output.display(), "saved chapter data");
    println!("Saved to {}", output.display());

    println!("\nText preview:");
    println!("{}...", preview(&data.korean_text, TEXT_PREVIEW_CHARS));
    println!("\nImage URL: {}", data.image_url);
    println!("\nDone! Open {} to copy the text.", output.display());
    Ok(data)
}

/// Write the chapter as pretty JSON, replacing any previous file.
pub fn write_chapter_data(path: &Path, data: &ChapterData) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(data).context("failed to serialize chapter data")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// At most `max_chars` leading characters of `text`.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
