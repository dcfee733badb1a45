//! Trace Emulator
//!
//! Producer side of the pipeline: replays a recorded trace as if a live
//! sensor were emitting it, one measurement per tick.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::Duration;

use measurement::Measurement;
use ring_buffer::RingBuffer;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::parser::{detect_delimiter, parse_header, parse_line};

/// Replays a delimited trace into a ring buffer.
///
/// Opening the emulator reads and validates the header, so an empty or
/// unreadable trace fails before any thread is spawned. `run` streams
/// the data rows and always closes the buffer on exit, on the success
/// and the error path alike.
pub struct TraceEmulator {
    reader: Box<dyn BufRead + Send>,
    delimiter: char,
    columns: Vec<String>,
    period: Duration,
    readings_produced: u64,
}

impl TraceEmulator {
    /// Open a trace file and read its header. `period_ms` is the pacing
    /// sleep between emissions; 0 means full speed.
    pub fn open(path: impl AsRef<Path>, period_ms: u64) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), period_ms)
            .map_err(|err| match err {
                SourceError::EmptyTrace(_) => SourceError::EmptyTrace(path.to_path_buf()),
                other => other,
            })
    }

    /// Build an emulator from any buffered reader. The header row is
    /// consumed immediately.
    pub fn from_reader(
        mut reader: impl BufRead + Send + 'static,
        period_ms: u64,
    ) -> Result<Self, SourceError> {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            return Err(SourceError::EmptyTrace(Default::default()));
        }
        let header = header.trim_end_matches(&['\r', '\n'][..]);

        let delimiter = detect_delimiter(header);
        let columns = parse_header(header, delimiter);
        info!(
            "trace source: {} columns, delimiter {:?}, period {}ms",
            columns.len(),
            delimiter,
            period_ms
        );

        Ok(Self {
            reader: Box::new(reader),
            delimiter,
            columns,
            period: Duration::from_millis(period_ms),
            readings_produced: 0,
        })
    }

    /// Column names of the trace, in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of measurements written so far.
    pub fn readings_produced(&self) -> u64 {
        self.readings_produced
    }

    /// Stream every data row into the buffer, pacing between emissions.
    /// The buffer is closed before returning, whatever the outcome, so
    /// the consumer always observes end-of-stream.
    pub fn run(&mut self, buffer: &RingBuffer<Measurement>) -> Result<u64, SourceError> {
        let result = self.stream(buffer);
        buffer.close();
        if let Err(err) = &result {
            warn!("trace source: stopping on error: {}", err);
        }
        result
    }

    fn stream(&mut self, buffer: &RingBuffer<Measurement>) -> Result<u64, SourceError> {
        let mut index = 0u64;
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            let row = line.trim();
            if row.is_empty() {
                continue;
            }

            let measurement = parse_line(index, row, &self.columns, self.delimiter);
            debug!(
                "trace source: row {} -> {} [buffer {}/{}]",
                index + 1,
                measurement,
                buffer.len(),
                buffer.capacity()
            );

            // Never blocks; the buffer drops the oldest element if full.
            buffer.write(measurement);
            self.readings_produced += 1;
            index += 1;

            if !self.period.is_zero() {
                thread::sleep(self.period);
            }
        }

        info!(
            "trace source: done, {} readings written, {} dropped",
            self.readings_produced,
            buffer.total_dropped()
        );
        Ok(self.readings_produced)
    }
}
