pub mod slots;
pub mod buckets;
pub mod store;
pub mod queue;

pub use slots::*;
pub use buckets::*;
pub use store::*;
pub use queue::*;
