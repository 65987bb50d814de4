//! Integration tests - whole conversions against in-process sources
//!
//! These tests drive the public API end to end: introspection, planning,
//! materialization, edge reconstruction, cleanup and output.

mod classification_tests;
mod conversion_tests;
mod fixture_tests;
