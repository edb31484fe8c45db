pub mod errors;
pub mod fs_atomic;
pub mod time;
pub mod xml;
