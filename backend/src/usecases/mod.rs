pub mod payment_gateway;
pub mod plan_catalog;
pub mod plans;
pub mod quota;
pub mod reconciliation;
pub mod transactions;

#[cfg(test)]
pub mod test_support;
