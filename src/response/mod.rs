mod outcome;
mod validate;

pub use outcome::{ApiFailure, ApiOutcome, FailureKind, RawResponse};
pub use validate::{validate, validate_transport};
