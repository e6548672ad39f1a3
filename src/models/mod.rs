pub mod customer;
pub mod order;

pub use customer::*;
pub use order::*;
