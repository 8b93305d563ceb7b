//! Format-preserving value generators.
//!
//! A [`Generator`] turns an original string into a synthetic replacement that
//! is a valid instance of the pattern's domain. Built-ins inspect their input
//! to preserve superficial shape (separators, case, country prefixes) but the
//! only contract is domain validity. Randomness comes from the OS generator;
//! in-run determinism is the dictionary's job, not the generators'.

pub mod data;
pub mod dob;
pub mod email;
pub mod finance;
pub mod format;
pub mod generator;
pub mod ids;
pub mod lorem;
pub mod manager;
pub mod network;
pub mod person;
pub mod phone;

pub use format::{FormatKind, FormatSpec};
pub use generator::{luhn_valid, Generator, GeneratorRegistry};
pub use manager::Manager;
