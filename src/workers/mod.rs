pub mod batch;
pub mod retry;

pub use batch::{BatchProcessor, BatchReport, ItemFailure, ItemState};
pub use retry::RetryPolicy;
