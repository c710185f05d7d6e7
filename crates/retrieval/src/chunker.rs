//! Fixed-size overlapping text chunking.

/// Split `text` into overlapping windows of `chunk_size` characters.
///
/// Windows advance by `chunk_size - overlap` characters (at least one),
/// so consecutive chunks share `overlap` characters of context. Splits
/// are on char boundaries, never inside a code point.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
