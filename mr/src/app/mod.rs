//! Map and reduce functions that workers can run.

pub mod wc;
