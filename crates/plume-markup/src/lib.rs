mod parser;
mod project;
mod writer;

pub use crate::parser::{MarkupError, parse_document};
pub use crate::project::{Projection, project_read_mode};
pub use crate::writer::write_document;
