pub mod calculate;
pub mod convert;
pub mod grid;
pub mod pointers;
pub mod report;
pub mod validate;
