//! Attendance arithmetic: period aggregation and tier classification.
//! Everything here is a pure function of the logs handed in.

pub mod aggregate;
pub mod classify;
