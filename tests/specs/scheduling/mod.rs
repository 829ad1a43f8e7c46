//! Assignment races and task lifecycle.

mod assignment;
mod lifecycle;
