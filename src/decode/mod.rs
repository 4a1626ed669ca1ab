//! Response decoder module
//!
//! # Overview
//!
//! Turns a response body into records plus the parsed body that pagination
//! metadata is read from. Records are found at an optional dotted
//! `records_path`; the root is used when it is unset.

mod decoder;

pub use decoder::PageDecoder;

#[cfg(test)]
mod tests;
