mod bucket;
mod declaration;
mod error;
mod rule;
mod value;

pub use bucket::{Bucket, sort_by_bucket};
pub use declaration::{Declaration, Nesting, SELF_SELECTOR};
pub use error::{
    ConfigError, ExtractError, InvariantViolation, Location, NormalizeError, ResolveError,
};
pub use rule::AtomicRule;
pub use value::{Value, format_number, object_insert};
