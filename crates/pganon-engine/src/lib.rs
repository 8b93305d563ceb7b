//! The pganon anonymization engine.
//!
//! The [`Anonymizer`] drives a whole run: preflight validation, foreign-key
//! analysis, and one SERIALIZABLE transaction in which every configured
//! column is streamed through a server-side cursor, rewritten through the
//! shared [`Dictionary`], and written back in batches.

pub mod anonymizer;
pub mod cancel;
pub mod dictionary;
pub mod json;
pub mod jsonpath;
pub mod processor;

pub use anonymizer::{Anonymizer, RunOptions};
pub use cancel::CancelFlag;
pub use dictionary::Dictionary;
