//! Formatter implementations

pub mod json;
pub mod string;

pub use crate::core::{Formatter, PassthroughFormatter};
pub use json::JsonFormatter;
pub use string::StringFormatter;
