//! Bounded worker pool that runs conversion batches.
//!
//! The pool admits at most `workers` jobs at a time, runs each job as its own
//! task against a [`Converter`](crate::converter::Converter), and joins the
//! batch back together in request order.

mod pool;
mod types;

pub use pool::WorkerPool;
pub use types::PoolStatus;
