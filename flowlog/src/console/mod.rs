//! Console output handling: line buffering and annotation stripping.

mod line_buffer;
mod notes;

pub use line_buffer::LineBuffer;
pub use notes::{Annotation, ConsoleNoteFilter, ParsedLine, POSTAMBLE, PREAMBLE};
