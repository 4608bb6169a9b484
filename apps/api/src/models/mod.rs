pub mod cache;
pub mod credit;
pub mod usage;
