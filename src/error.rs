//! Error codes shared by every module's error enum.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Grepable, stable identifier for an error variant.
///
/// Used as a structured `code` field in log events so failures that are
/// deliberately swallowed (gesture aborts, ignored deletes) stay searchable.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}
