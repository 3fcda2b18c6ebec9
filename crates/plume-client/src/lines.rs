//! Byte-to-line reassembly for the NDJSON response body

/// Buffers raw body chunks and yields complete, non-blank lines.
///
/// Splitting happens on raw bytes before any UTF-8 decoding: a continuation
/// byte can never equal `\n`, so a multi-byte character split across chunk
/// boundaries reassembles before the line is decoded. Each complete line is
/// decoded lossily. Dropping the decoder discards any unterminated residue,
/// which cannot form a complete record.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk, draining every line it completes.
    ///
    /// Line terminators (`\n`, with an optional preceding `\r`) are trimmed.
    /// Lines that are blank after trimming are suppressed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let text = String::from_utf8_lossy(&line);
            if !text.trim().is_empty() {
                lines.push(text.into_owned());
            }
        }
        lines
    }
}
