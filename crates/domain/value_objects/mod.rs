pub mod enums;
pub mod pagination;
pub mod payment_webhook;
pub mod plans;
pub mod quota;
pub mod subscriptions;
pub mod transactions;
