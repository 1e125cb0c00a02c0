use std::io::{BufRead, Read};
use tracing::debug;

use super::{
    HEADER_WIDTH, LogRecord, MESSAGE_OFFSET, Origin, STDERR_MARKER, STDIN_MARKER, STDOUT_MARKER,
    TIMESTAMP_END,
};
use crate::config::LogOptions;
use crate::error::DecodeError;

/// Decodes a newline-delimited multiplexed log capture.
///
/// The whole stream is read; the first malformed line aborts the decode and
/// no records are returned.
#[derive(Debug, Clone, Default)]
pub struct LogDecoder {
    options: LogOptions,
}

impl LogDecoder {
    pub fn new(options: LogOptions) -> Self {
        LogDecoder { options }
    }

    pub fn decode<R: BufRead>(&self, mut reader: R) -> Result<Vec<LogRecord>, DecodeError> {
        let limit = self.options.max_line_len;
        let mut records = Vec::new();
        let mut line = Vec::new();
        let mut number = 0;

        loop {
            line.clear();
            // One extra byte leaves room for the newline of a line at the limit
            let read = (&mut reader)
                .take((limit as u64).saturating_add(1))
                .read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            number += 1;

            if line.last() == Some(&b'\n') {
                line.pop();
            } else if line.len() > limit {
                return Err(DecodeError::LineTooLong {
                    line: number,
                    limit,
                });
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            records.push(self.decode_line(number, &line)?);
        }

        debug!(
            lines = records.len(),
            timestamps = self.options.timestamps,
            "decoded log stream"
        );
        Ok(records)
    }

    /// Decode one line with its trailing newline already removed.
    ///
    /// `number` is the 1-based line number reported in errors.
    pub fn decode_line(&self, number: usize, line: &[u8]) -> Result<LogRecord, DecodeError> {
        let marker = *line
            .first()
            .ok_or(DecodeError::EmptyLine { line: number })?;

        let origin = match marker {
            STDIN_MARKER => return Err(DecodeError::UnexpectedStdin { line: number }),
            STDOUT_MARKER => Origin::Stdout,
            STDERR_MARKER => Origin::Stderr,
            marker => {
                return Err(DecodeError::UnknownStreamMarker {
                    line: number,
                    marker,
                });
            }
        };

        let needed = if self.options.timestamps {
            MESSAGE_OFFSET
        } else {
            HEADER_WIDTH
        };
        if line.len() < needed {
            return Err(DecodeError::LineTooShort {
                line: number,
                needed,
                actual: line.len(),
            });
        }

        let timestamp = self
            .options
            .timestamps
            .then(|| String::from_utf8_lossy(&line[HEADER_WIDTH..TIMESTAMP_END]).into_owned());

        Ok(LogRecord {
            origin,
            timestamp,
            message: String::from_utf8_lossy(&line[needed..]).into_owned(),
        })
    }
}
