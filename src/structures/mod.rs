/// Core reusable data structures
pub mod link_table;

// Export the main types
pub use link_table::{LinkTable, SlotEntry};
