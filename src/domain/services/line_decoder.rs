#[cfg(test)]
#[path = "line_decoder_test.rs"]
mod tests;

use std::io;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Longest line accepted by [`LineFrameDecoder::new`], newline excluded.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Frames a chunked byte stream into newline delimited lines.
///
/// Bytes stay buffered until their terminating `\n` arrives, so a line may
/// span any number of chunks and a chunk may hold any number of lines. Text is
/// only decoded once a line is complete, which keeps multi-byte characters
/// split across chunks intact. Lines are yielded without their newline.
///
/// A line longer than `max_length` bytes is an `InvalidData` error, which
/// ends the stream.
#[derive(Debug)]
pub struct LineFrameDecoder {
    // Bytes before this offset are known to hold no newline.
    next_index: usize,
    max_length: usize,
}

impl LineFrameDecoder {
    pub fn new() -> LineFrameDecoder {
        return LineFrameDecoder::with_max_length(MAX_LINE_LENGTH);
    }

    pub fn with_max_length(max_length: usize) -> LineFrameDecoder {
        return LineFrameDecoder {
            next_index: 0,
            max_length,
        };
    }

    pub fn max_length(&self) -> usize {
        return self.max_length;
    }

    fn too_long(&self, len: usize) -> io::Error {
        tracing::error!(len, max_length = self.max_length, "Stream line is too long");
        return io::Error::new(
            io::ErrorKind::InvalidData,
            format!("stream line exceeds {} bytes", self.max_length),
        );
    }
}

impl Default for LineFrameDecoder {
    fn default() -> LineFrameDecoder {
        return LineFrameDecoder::new();
    }
}

fn to_line(bytes: &[u8]) -> String {
    return String::from_utf8_lossy(bytes).into_owned();
}

impl Decoder for LineFrameDecoder {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        let offset = self.next_index.min(buf.len());
        let newline = buf[offset..].iter().position(|b| return *b == b'\n');

        match newline {
            Some(pos) => {
                let line_len = offset + pos;
                if line_len > self.max_length {
                    return Err(self.too_long(line_len));
                }

                let frame = buf.split_to(line_len + 1);
                self.next_index = 0;

                return Ok(Some(to_line(&frame[..frame.len() - 1])));
            }
            None => {
                if buf.len() > self.max_length {
                    return Err(self.too_long(buf.len()));
                }
                self.next_index = buf.len();

                return Ok(None);
            }
        }
    }

    /// Drains complete lines first. A non-blank trailing segment the server
    /// never terminated is still handed out as the last line.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }

        self.next_index = 0;
        if buf.is_empty() {
            return Ok(None);
        }

        let rest = buf.split_to(buf.len());
        let line = to_line(&rest);
        if line.trim().is_empty() {
            return Ok(None);
        }

        tracing::debug!(bytes = rest.len(), "Flushing unterminated final line");
        return Ok(Some(line));
    }
}
