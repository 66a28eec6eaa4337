mod memory;
pub use memory::*;

#[cfg(test)]
mod memory_test;
