use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Expired,
    Cancel,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Expired => "expired",
            TransactionStatus::Cancel => "cancel",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "success" => TransactionStatus::Success,
            "failed" => TransactionStatus::Failed,
            "expired" => TransactionStatus::Expired,
            "cancel" => TransactionStatus::Cancel,
            _ => TransactionStatus::Pending,
        }
    }

    /// Reconciliation stops at these. `Cancel` and `Expired` are deliberately
    /// left out: the gateway may still report a different outcome for the order.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Success | TransactionStatus::Failed)
    }

    /// Maps the gateway's `transaction_status` / `fraud_status` pair onto the
    /// internal lifecycle. Anything unrecognised stays pending.
    pub fn from_gateway(transaction_status: &str, fraud_status: &str) -> Self {
        match transaction_status {
            "capture" if fraud_status == "accept" => TransactionStatus::Success,
            "capture" => TransactionStatus::Pending,
            "settlement" => TransactionStatus::Success,
            "pending" => TransactionStatus::Pending,
            "deny" => TransactionStatus::Failed,
            "cancel" => TransactionStatus::Cancel,
            "expire" => TransactionStatus::Expired,
            "refund" | "partial_refund" => TransactionStatus::Failed,
            _ => TransactionStatus::Pending,
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_gateway_status() {
        let cases = [
            ("capture", "accept", TransactionStatus::Success),
            ("capture", "challenge", TransactionStatus::Pending),
            ("capture", "", TransactionStatus::Pending),
            ("settlement", "", TransactionStatus::Success),
            ("settlement", "challenge", TransactionStatus::Success),
            ("pending", "", TransactionStatus::Pending),
            ("deny", "accept", TransactionStatus::Failed),
            ("cancel", "", TransactionStatus::Cancel),
            ("expire", "", TransactionStatus::Expired),
            ("refund", "", TransactionStatus::Failed),
            ("partial_refund", "", TransactionStatus::Failed),
            ("authorize", "accept", TransactionStatus::Pending),
            ("", "", TransactionStatus::Pending),
        ];

        for (transaction_status, fraud_status, expected) in cases {
            assert_eq!(
                TransactionStatus::from_gateway(transaction_status, fraud_status),
                expected,
                "transaction_status={transaction_status} fraud_status={fraud_status}"
            );
        }
    }

    #[test]
    fn only_success_and_failed_are_terminal() {
        assert!(TransactionStatus::Success.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Cancel.is_terminal());
        assert!(!TransactionStatus::Expired.is_terminal());
    }

    #[test]
    fn stored_strings_round_trip() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Success,
            TransactionStatus::Failed,
            TransactionStatus::Expired,
            TransactionStatus::Cancel,
        ] {
            assert_eq!(TransactionStatus::from_str(status.as_str()), status);
        }
        assert_eq!(TransactionStatus::from_str("garbage"), TransactionStatus::Pending);
    }
}
