pub mod plans;
pub mod quota;
pub mod transactions;
