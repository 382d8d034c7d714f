//! Schedule and report exports.

pub mod export;
