pub mod round_robin;
mod waiter;

pub use round_robin::CallQueue;
