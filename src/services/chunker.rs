/// Default upper bound, in characters, for a single chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Split text into word-boundary chunks of roughly `max_length` characters.
///
/// Every word is charged its length plus one separator. When charging the
/// next word would push the running total past `max_length`, the current
/// chunk is closed and the word opens a new one. Words are never split, so a
/// word longer than `max_length` ends up alone in its own chunk.
///
/// Whitespace is normalized: chunks re-join their words with single spaces.
/// Empty or whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, max_length: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_length = 0usize;

    for word in text.split_whitespace() {
        let cost = word.chars().count() + 1;
        current_length += cost;

        if current_length > max_length && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
            current_length = cost;
        }

        current.push(word);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}
