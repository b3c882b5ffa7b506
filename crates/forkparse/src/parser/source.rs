//! Character sources
//!
//! The parser reads its input through a [`ForkableStream<char>`]. Sources
//! that can fail (readers) park their error in a shared [`SourceError`] slot
//! and end the stream; the parser checks the slot once the run is over.

use crate::error::ParseError;
use crate::forkable::{ForkableStream, lock};
use std::io::{self, BufReader, Bytes, Read};
use std::sync::{Arc, Mutex};

/// First error raised by a character source
#[derive(Debug, Clone, Default)]
pub struct SourceError {
    slot: Arc<Mutex<Option<ParseError>>>,
}

impl SourceError {
    fn set(&self, error: ParseError) {
        lock(&self.slot).get_or_insert(error);
    }

    /// Take the recorded error, if any
    #[must_use]
    pub fn take(&self) -> Option<ParseError> {
        lock(&self.slot).take()
    }
}

/// Stream over the characters of a string
#[must_use]
pub fn str_stream(input: &str) -> ForkableStream<char> {
    ForkableStream::from_iter(input.chars().collect::<Vec<_>>())
}

/// Stream decoding UTF-8 from `reader`, one scalar value at a time
///
/// Read errors and malformed input end the stream and are recorded in the
/// returned [`SourceError`].
pub fn reader_stream<R>(reader: R) -> (ForkableStream<char>, SourceError)
where
    R: Read + Send + 'static,
{
    let error = SourceError::default();
    let chars = ReadChars {
        bytes: BufReader::new(reader).bytes(),
        error: error.clone(),
    };
    (ForkableStream::from_iter(chars), error)
}

/// Iterator decoding the bytes of a reader as UTF-8
struct ReadChars<R> {
    bytes: Bytes<BufReader<R>>,
    error: SourceError,
}

impl<R: Read> ReadChars<R> {
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.bytes.next() {
                Some(Err(error)) if error.kind() == io::ErrorKind::Interrupted => {}
                other => return other.transpose(),
            }
        }
    }

    // Decodes one scalar at a time instead of chunking with `str::from_utf8`:
    // the parse pulls characters on demand, so reading ahead to a chunk
    // boundary would block on interactive readers, and a chunk could end
    // inside a multi-byte sequence. A bad sequence is reported with exactly
    // the bytes that form it.
    fn decode(&mut self) -> Result<Option<char>, ParseError> {
        let Some(first) = self.next_byte()? else {
            return Ok(None);
        };
        let width = match first {
            0x00..=0x7f => return Ok(Some(char::from(first))),
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Err(ParseError::InvalidUtf8 { bytes: vec![first] }),
        };
        let mut buffer = [first, 0, 0, 0];
        for filled in 1..width {
            match self.next_byte()? {
                Some(byte) => buffer[filled] = byte,
                None => {
                    return Err(ParseError::InvalidUtf8 {
                        bytes: buffer[..filled].to_vec(),
                    });
                }
            }
        }
        let bytes = &buffer[..width];
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| text.chars().next())
            .map(Some)
            .ok_or_else(|| ParseError::InvalidUtf8 { bytes: bytes.to_vec() })
    }
}

impl<R: Read> Iterator for ReadChars<R> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self.decode() {
            Ok(c) => c,
            Err(error) => {
                self.error.set(error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut stream: ForkableStream<char>) -> String {
        let mut text = String::new();
        while let Some(c) = stream.next().unwrap() {
            text.push(c);
        }
        text
    }

    #[test]
    fn test_str_stream() {
        assert_eq!(drain(str_stream("héllo, мир")), "héllo, мир");
    }

    #[test]
    fn test_reader_decodes_utf8() {
        let text = "a€𝄞ß";
        let (stream, error) = reader_stream(io::Cursor::new(text.as_bytes().to_vec()));
        assert_eq!(drain(stream), text);
        assert!(error.take().is_none());
    }

    #[test]
    fn test_reader_reports_invalid_utf8() {
        let (stream, error) = reader_stream(io::Cursor::new(vec![b'o', b'k', 0xff, b'x']));
        assert_eq!(drain(stream), "ok");
        match error.take() {
            Some(ParseError::InvalidUtf8 { bytes }) => assert_eq!(bytes, [0xff]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_reader_reports_truncated_sequence() {
        let (stream, error) = reader_stream(io::Cursor::new(vec![b'a', 0xe2, 0x82]));
        assert_eq!(drain(stream), "a");
        assert!(matches!(
            error.take(),
            Some(ParseError::InvalidUtf8 { bytes }) if bytes == [0xe2, 0x82]
        ));
    }

    #[test]
    fn test_reader_reports_io_error() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk on fire"))
            }
        }
        let (stream, error) = reader_stream(Broken);
        assert_eq!(drain(stream), "");
        assert!(matches!(error.take(), Some(ParseError::Source(_))));
    }
}
