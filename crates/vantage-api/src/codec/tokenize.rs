// ── Line tokenizer ──
//
// Splits a protocol line on whitespace while keeping quoted strings
// (with `\"` escapes) and bracketed byte buffers as single tokens.
// Tokens borrow from the line; quotes and brackets are preserved so the
// typed decoders can tell the wire forms apart.

/// Split a line into wire tokens.
pub fn tokenize(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let end = match bytes[pos] {
            b'"' => scan_quoted(bytes, pos),
            b'{' => scan_until(bytes, pos, b'}'),
            b'[' => scan_until(bytes, pos, b']'),
            _ => scan_bare(bytes, pos),
        };
        tokens.push(&line[start..end]);
        pos = end;
    }

    tokens
}

/// Index one past the closing quote, or the end of the line when unterminated.
fn scan_quoted(bytes: &[u8], start: usize) -> usize {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'"' => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

fn scan_until(bytes: &[u8], start: usize, close: u8) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == close)
        .map_or(bytes.len(), |offset| start + offset + 1)
}

fn scan_bare(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(u8::is_ascii_whitespace)
        .map_or(bytes.len(), |offset| start + offset)
}
