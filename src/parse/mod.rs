mod error;
mod grammar;

pub use error::ParseError;

use crate::ast::{Module, Span};

/// Parse component source text into a [`Module`].
///
/// # Errors
///
/// Returns [`ParseError`] with the line and column of the first input the
/// grammar cannot accept.
pub fn parse(source: &str) -> Result<Module, ParseError> {
    use winnow::stream::LocatingSlice;
    use winnow::Parser;

    grammar::module
        .parse(LocatingSlice::new(source))
        .map_err(|e| {
            let offset = e.offset();
            let (line, column) = Span::new(offset, offset).line_col(source);
            let mut message = e.inner().to_string();
            if message.is_empty() {
                message = "unexpected input".to_owned();
            }
            ParseError::new(message, line, column)
        })
}
