pub mod aggregate;
pub mod profit_share;
