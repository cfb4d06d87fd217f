pub mod fifo_drop_oldest_queue;
pub mod latest1_queue;

pub use fifo_drop_oldest_queue::*;
pub use latest1_queue::*;
