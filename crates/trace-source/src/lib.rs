//! Trace Source
//!
//! Reads a delimited text trace and emits one `Measurement` per tick
//! into the ring buffer, pacing emissions like a real sensor. Delimiter
//! and value types are auto-detected from the file.

pub mod emulator;
pub mod error;
pub mod parser;

pub use emulator::TraceEmulator;
pub use error::SourceError;
pub use parser::{
    detect_delimiter, parse_days_timestamp, parse_header, parse_line, parse_value, time_column,
    time_seconds, time_value,
};
