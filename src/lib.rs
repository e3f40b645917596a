pub mod core;
pub mod engine;
pub mod hal;
pub mod observability;
pub mod storage;
pub mod visualization;
