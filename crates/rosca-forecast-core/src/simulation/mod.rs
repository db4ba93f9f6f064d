pub mod driver;
pub mod tables;
