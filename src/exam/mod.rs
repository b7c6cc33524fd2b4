// src/exam/mod.rs

pub mod flow;
pub mod registry;

pub use registry::{ExamOutcome, ExamRegistry, ExamStatus, Finish, RESULT_RETENTION};
