use serde::{Deserialize, Deserializer};

/// Fields of a gateway payment notification that reconciliation reads.
///
/// Everything is optional and defaults to empty; unknown fields are ignored.
/// Numeric fields are accepted either as JSON strings or numbers because the
/// signature is computed over their textual form.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PaymentNotification {
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status_code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gross_amount: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub signature_key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fraud_status: String,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    })
}
