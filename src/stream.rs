use std::io::BufRead;

use tracing::warn;

use crate::detection::Detection;
use crate::error::Error;
use crate::frame::Frame;
use crate::session::{CounterSession, FrameOutcome, Totals};

/// Anything that yields tracker output frame after frame, in temporal order.
pub trait TrackSource {
    fn dims(&self) -> (u32, u32);
    fn next_frame(&mut self) -> Result<Option<Frame>, Error>;
}

/// Reads tracker dumps, one frame per line:
///
/// ```text
/// 12:[{"id":3,"c":0,"b":[410.0,220.5,470.0,380.0]}]
/// ```
///
/// Empty lines and lines starting with `#` are skipped. Malformed lines are
/// logged and skipped unless the reader is strict.
pub struct DumpReader<R> {
    reader: R,
    dims: (u32, u32),
    line_no: usize,
    strict: bool,
    buf: Vec<u8>,
}

impl<R: BufRead> DumpReader<R> {
    pub fn new(reader: R, dims: (u32, u32)) -> Self {
        Self {
            reader,
            dims,
            line_no: 0,
            strict: false,
            buf: Vec::new(),
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn parse_line(line: &str, line_no: usize, dims: (u32, u32)) -> Result<Frame, Error> {
        let dump_err = |reason: String| Error::Dump {
            line: line_no,
            reason,
        };

        let idx = line
            .find(':')
            .ok_or_else(|| dump_err("expected `:`".into()))?;
        let (index, vector) = line.split_at(idx);

        let index = index
            .trim()
            .parse::<u64>()
            .map_err(|e| dump_err(format!("parse frame index failed: {}", e)))?;
        let detections: Vec<Detection> = serde_json::from_str(&vector[1..])
            .map_err(|e| dump_err(format!("parse json failed: {}", e)))?;

        Ok(Frame::new(index, dims, detections))
    }
}

impl<R: BufRead> TrackSource for DumpReader<R> {
    #[inline]
    fn dims(&self) -> (u32, u32) {
        self.dims
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let parsed = match std::str::from_utf8(&self.buf) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    Self::parse_line(line, self.line_no, self.dims)
                }
                Err(e) => Err(Error::Dump {
                    line: self.line_no,
                    reason: format!("invalid UTF-8: {}", e),
                }),
            };

            match parsed {
                Ok(frame) => return Ok(Some(frame)),
                Err(err) if self.strict => return Err(err),
                Err(err) => {
                    warn!("skipping dump line: {}", err);
                    continue;
                }
            }
        }
    }
}

/// Feeds every frame of `source` into `session` and returns the session totals.
///
/// `on_frame` sees each frame with its outcome, for live reporting; an error
/// from it stops the replay.
pub fn replay<S, F>(
    source: &mut S,
    session: &mut CounterSession,
    mut on_frame: F,
) -> Result<Totals, Error>
where
    S: TrackSource + ?Sized,
    F: FnMut(&Frame, &FrameOutcome) -> Result<(), Error>,
{
    while let Some(frame) = source.next_frame()? {
        let outcome = session.update(&frame)?;
        on_frame(&frame, &outcome)?;
    }

    Ok(session.totals())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DIMS: (u32, u32) = (640, 480);

    #[test]
    fn reads_frames_and_skips_comments() {
        let dump = "# tracker dump\n\n1:[{\"id\":1,\"c\":0,\"b\":[0,0,10,10]}]\n2:[]\n";
        let mut reader = DumpReader::new(Cursor::new(dump), DIMS);

        let first = reader.next_frame().unwrap().unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(first.dims, DIMS);
        assert_eq!(first.detections, vec![Detection::new(1, 0, 0.0, 0.0, 10.0, 10.0)]);

        let second = reader.next_frame().unwrap().unwrap();
        assert_eq!(second.index, 2);
        assert!(second.is_empty());

        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn lenient_reader_skips_malformed_lines() {
        let dump = "1:[]\nnot a frame\n2:[{\"id\":1}]\n3:[]\n";
        let mut reader = DumpReader::new(Cursor::new(dump), DIMS);

        let indexes: Vec<u64> = std::iter::from_fn(|| reader.next_frame().unwrap())
            .map(|f| f.index)
            .collect();

        assert_eq!(indexes, vec![1, 3]);
    }

    #[test]
    fn strict_reader_reports_line_number() {
        let dump = "1:[]\nx:[]\n";
        let mut reader = DumpReader::new(Cursor::new(dump), DIMS).strict(true);

        reader.next_frame().unwrap();
        match reader.next_frame() {
            Err(Error::Dump { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn lenient_reader_skips_lines_that_are_not_utf8() {
        let dump = b"1:[]\n\xff\xfe\n3:[]\n";
        let mut reader = DumpReader::new(Cursor::new(&dump[..]), DIMS);

        let indexes: Vec<u64> = std::iter::from_fn(|| reader.next_frame().unwrap())
            .map(|f| f.index)
            .collect();

        assert_eq!(indexes, vec![1, 3]);
    }

    #[test]
    fn strict_reader_rejects_lines_that_are_not_utf8() {
        let dump = b"1:[]\n2:[\xc3]\n";
        let mut reader = DumpReader::new(Cursor::new(&dump[..]), DIMS).strict(true);

        reader.next_frame().unwrap();
        match reader.next_frame() {
            Err(Error::Dump { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.starts_with("invalid UTF-8"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
