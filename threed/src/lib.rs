pub mod grid;
pub mod index;
pub mod order;

pub use grid::Grid;
pub use index::IndexError;
pub use order::MemoryOrder;
