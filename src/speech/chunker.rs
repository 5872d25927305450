//! Sentence chunking for speech output.

/// Characters that end a chunk.
fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n')
}

/// Split `text` into speakable chunks.
///
/// A chunk is a run of non-terminator characters followed by every
/// terminator that immediately follows it, or the trailing remainder when the
/// text does not end in a terminator. Terminators with no text before them are
/// dropped. Chunks keep their surrounding whitespace.
///
/// ```
/// use devassist::speech::split_into_chunks;
///
/// let chunks = split_into_chunks("Hello there. How are you? Great!");
/// assert_eq!(chunks, vec!["Hello there.", " How are you?", " Great!"]);
/// ```
pub fn split_into_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_terminators = false;

    for (i, c) in text.char_indices() {
        let terminator = is_terminator(c);
        match start {
            None if terminator => {}
            None => {
                start = Some(i);
                in_terminators = false;
            }
            Some(s) if !terminator && in_terminators => {
                chunks.push(&text[s..i]);
                start = Some(i);
                in_terminators = false;
            }
            Some(_) if terminator => in_terminators = true,
            Some(_) => {}
        }
    }

    if let Some(s) = start {
        chunks.push(&text[s..]);
    }
    chunks
}
