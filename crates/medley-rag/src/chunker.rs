//! Overlapping character-window chunker.

/// Window geometry for [`chunk_text`].
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Characters per window.
    pub size: usize,
    /// Characters shared by consecutive windows.
    pub overlap: usize,
    /// A trimmed window is kept only when strictly longer than this.
    pub min_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { size: 500, overlap: 50, min_chars: 80 }
    }
}

impl ChunkerConfig {
    fn step(&self) -> usize {
        self.size.saturating_sub(self.overlap).max(1)
    }
}

/// Split `text` into windows of `size` characters advancing by
/// `size - overlap`. Windows are trimmed and short ones dropped.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    // Byte offset of every char, plus the end, so windows never split a code point.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_count = bounds.len();
    bounds.push(text.len());

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + config.size).min(char_count);
        let window = text[bounds[start]..bounds[end]].trim();
        if window.chars().count() > config.min_chars {
            chunks.push(window.to_string());
        }
        start += config.step();
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cfg(size: usize, overlap: usize, min_chars: usize) -> ChunkerConfig {
        ChunkerConfig { size, overlap, min_chars }
    }

    #[test]
    fn test_windows_overlap_by_configured_amount() {
        let text: String = ('a'..='z').cycle().take(30).collect();
        let chunks = chunk_text(&text, &cfg(10, 2, 0));
        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "ijklmnopqr");
        // Starts at 0, 8, 16, 24
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_short_windows_are_dropped() {
        let text = format!("{}{}", "x".repeat(500), "tail");
        let chunks = chunk_text(&text, &ChunkerConfig::default());
        // Second window covers 50 x's plus "tail": 54 chars, not kept.
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 500);
    }

    #[test]
    fn test_whitespace_is_trimmed_before_length_check() {
        let text = format!("{}{}", " ".repeat(400), "y".repeat(81));
        let chunks = chunk_text(&text, &cfg(500, 50, 80));
        assert_eq!(chunks, vec!["y".repeat(81)]);

        let padded = format!("{}{}", " ".repeat(400), "y".repeat(80));
        assert!(chunk_text(&padded, &cfg(500, 50, 80)).is_empty());
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "é".repeat(12);
        let chunks = chunk_text(&text, &cfg(5, 0, 0));
        assert_eq!(chunks, vec!["ééééé", "ééééé", "éé"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", &ChunkerConfig::default()).is_empty());
    }
}
