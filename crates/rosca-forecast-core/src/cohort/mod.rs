pub mod generator;
pub mod record;
