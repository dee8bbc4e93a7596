pub mod memory;

pub use memory::InMemoryLog;
