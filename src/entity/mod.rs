pub mod attributes;
pub mod goals;
pub mod memory;
pub mod needs;
pub mod tasks;
