pub mod becs;
pub mod soap;
