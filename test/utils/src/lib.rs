/// A recorded response body from the agent API: two deltas, one research
/// progress step and a quick-reply directive, newline delimited.
pub fn ndjson_fixture() -> &'static str {
    return r#"{"session_id": "a1b2c3", "type": "progress", "content": "Searching for: eco-friendly water bottles"}
{"session_id": "a1b2c3", "response": "Great product! ", "node": "gather_product"}
{"session_id": "a1b2c3", "response": "Which channel should we focus on? <BUTTONS>Instagram, TikTok , Email</BUTTONS>", "node": "manager"}
"#;
}

/// Splits a payload into chunks of at most `size` bytes, ignoring UTF-8
/// boundaries the way a network read would.
pub fn chunk_bytes(payload: &[u8], size: usize) -> Vec<Vec<u8>> {
    return payload
        .chunks(size.max(1))
        .map(|chunk| {
            return chunk.to_vec();
        })
        .collect();
}

/// Splits a payload at every given offset. Offsets past the end are ignored.
pub fn split_at_offsets(payload: &[u8], offsets: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = vec![];
    let mut start = 0;
    for offset in offsets {
        if *offset <= start || *offset > payload.len() {
            continue;
        }
        chunks.push(payload[start..*offset].to_vec());
        start = *offset;
    }
    chunks.push(payload[start..].to_vec());

    return chunks;
}
