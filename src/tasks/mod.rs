//! Background Tasks Module
//!
//! Optional periodic maintenance for hosts running a tokio runtime.

mod trim;

pub use trim::spawn_trim_task;
