//! UTF-8 re-chunker (spec.md §4.5 item 1): byte chunks from the transport rarely align with
//! UTF-8 character boundaries, so every adapter downstream of this one gets whole strings.

#[derive(Debug, Default)]
pub struct Utf8Rechunker {
    buf: Vec<u8>,
}

impl Utf8Rechunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning as much valid UTF-8 as can be decoded. Any trailing
    /// incomplete multibyte sequence is held back for the next call.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.buf.extend_from_slice(bytes);
        match std::str::from_utf8(&self.buf) {
            Ok(s) => {
                let out = s.to_string();
                self.buf.clear();
                out
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                // Safety: `valid_up_to` is exactly the length std::str::from_utf8 validated.
                let valid = unsafe { std::str::from_utf8_unchecked(&self.buf[..valid_up_to]) }.to_string();
                let remainder = self.buf[valid_up_to..].to_vec();
                if e.error_len().is_none() {
                    // Trailing bytes are an incomplete (not invalid) sequence — keep buffering.
                    self.buf = remainder;
                } else {
                    // A genuinely invalid sequence appeared mid-stream; drop it rather than
                    // stall the buffer forever waiting for bytes that will never complete it.
                    self.buf.clear();
                }
                valid
            }
        }
    }

    /// Flush whatever is left at end-of-stream. A still-incomplete sequence becomes one
    /// replacement character rather than being silently dropped.
    pub fn flush(&mut self) -> String {
        if self.buf.is_empty() {
            return String::new();
        }
        let out = match std::str::from_utf8(&self.buf) {
            Ok(s) => s.to_string(),
            Err(_) => "\u{FFFD}".to_string(),
        };
        self.buf.clear();
        out
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_bytes_split_across_a_multibyte_character() {
        let mut r = Utf8Rechunker::new();
        let bytes = "héllo".as_bytes();
        // split inside the 2-byte 'é' (0xC3 0xA9)
        let (first, second) = bytes.split_at(2);
        let mut out = r.push(first);
        out.push_str(&r.push(second));
        assert_eq!(out, "héllo");
    }

    #[test]
    fn flush_emits_replacement_for_truncated_trailing_sequence() {
        let mut r = Utf8Rechunker::new();
        r.push(&[0xE2, 0x82]); // incomplete 3-byte sequence (would be '€')
        assert_eq!(r.flush(), "\u{FFFD}");
    }

    #[test]
    fn reset_clears_buffered_bytes() {
        let mut r = Utf8Rechunker::new();
        r.push(&[0xE2, 0x82]);
        r.reset();
        assert_eq!(r.flush(), "");
    }
}
