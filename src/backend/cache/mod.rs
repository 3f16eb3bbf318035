//! Process-local caches persisted across restarts

pub mod driver;

pub use driver::DriverCache;
