pub mod cache;
pub mod plans;
pub mod subscriptions;
pub mod transactions;
pub mod usages;
