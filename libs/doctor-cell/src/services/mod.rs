pub mod availability;
pub mod directory;
