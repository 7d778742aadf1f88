//! HTTP surface of the learning platform (system of record).

pub mod app;
pub mod relay;
