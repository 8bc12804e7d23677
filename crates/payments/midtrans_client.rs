use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use tracing::error;
use url::Url;

const SANDBOX_SNAP_BASE_URL: &str = "https://app.sandbox.midtrans.com/";
const SANDBOX_API_BASE_URL: &str = "https://api.sandbox.midtrans.com/";
const PRODUCTION_SNAP_BASE_URL: &str = "https://app.midtrans.com/";
const PRODUCTION_API_BASE_URL: &str = "https://api.midtrans.com/";

#[derive(Debug, Clone, Default)]
pub struct MidtransConfig {
    pub server_key: String,
    pub client_key: String,
    pub is_production: bool,
    /// Overrides the Snap host derived from `is_production`.
    pub snap_base_url: Option<String>,
    /// Overrides the Core API host derived from `is_production`.
    pub api_base_url: Option<String>,
}

/// Minimal Midtrans client built on reqwest: Snap for hosted payment pages,
/// Core API for authoritative transaction status.
pub struct MidtransClient {
    http: reqwest::Client,
    server_key: String,
    client_key: String,
    snap_base_url: Url,
    api_base_url: Url,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SnapItemDetail {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SnapCustomerDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapTransactionRequest {
    pub order_id: String,
    pub gross_amount: i64,
    pub item_details: Vec<SnapItemDetail>,
    pub customer_details: SnapCustomerDetail,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SnapSession {
    pub token: String,
    pub redirect_url: String,
}

/// Core API status response. `raw` keeps the full body for the audit column.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayTransactionStatus {
    pub transaction_id: String,
    pub order_id: String,
    pub transaction_status: String,
    pub fraud_status: String,
    pub payment_type: String,
    pub gross_amount: String,
    pub status_code: String,
    pub status_message: String,
    pub raw: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SnapRequestBody<'a> {
    transaction_details: SnapTransactionDetails<'a>,
    item_details: &'a [SnapItemDetail],
    customer_details: &'a SnapCustomerDetail,
}

#[derive(Debug, Serialize)]
struct SnapTransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Debug, Default, Deserialize)]
struct StatusBody {
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    transaction_status: Option<String>,
    #[serde(default)]
    fraud_status: Option<String>,
    #[serde(default)]
    payment_type: Option<String>,
    #[serde(default)]
    gross_amount: Option<String>,
    #[serde(default)]
    status_code: Option<String>,
    #[serde(default)]
    status_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MidtransErrorEnvelope {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    status_message: Option<String>,
}

impl MidtransClient {
    pub fn new(config: MidtransConfig) -> Result<Self> {
        let (default_snap, default_api) = if config.is_production {
            (PRODUCTION_SNAP_BASE_URL, PRODUCTION_API_BASE_URL)
        } else {
            (SANDBOX_SNAP_BASE_URL, SANDBOX_API_BASE_URL)
        };

        let snap_base_url = parse_base_url(config.snap_base_url.as_deref().unwrap_or(default_snap))
            .context("invalid Midtrans Snap base url")?;
        let api_base_url = parse_base_url(config.api_base_url.as_deref().unwrap_or(default_api))
            .context("invalid Midtrans API base url")?;

        Ok(Self {
            http: reqwest::Client::new(),
            server_key: config.server_key,
            client_key: config.client_key,
            snap_base_url,
            api_base_url,
        })
    }

    pub fn client_key(&self) -> &str {
        &self.client_key
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (error_messages, status_message) =
            match serde_json::from_str::<MidtransErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.error_messages, envelope.status_message),
                Err(_) => (Vec::new(), None),
            };

        error!(
            status = %status,
            midtrans_error_messages = ?error_messages,
            midtrans_status_message = ?status_message,
            response_body = %body,
            context = %context,
            "midtrans api request failed"
        );

        anyhow::bail!("Midtrans API request failed: {} (status {})", context, status);
    }

    /// Creates a Snap session and returns its token and hosted payment page URL.
    pub async fn create_snap_transaction(
        &self,
        request: &SnapTransactionRequest,
    ) -> Result<SnapSession> {
        if request.order_id.is_empty() {
            anyhow::bail!("order id is required");
        }

        let body = SnapRequestBody {
            transaction_details: SnapTransactionDetails {
                order_id: &request.order_id,
                gross_amount: request.gross_amount,
            },
            item_details: &request.item_details,
            customer_details: &request.customer_details,
        };

        let resp = self
            .http
            .post(self.snap_base_url.join("snap/v1/transactions")?)
            .basic_auth(&self.server_key, Some(""))
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create snap transaction").await?;

        let session: SnapSession = resp.json().await?;
        Ok(session)
    }

    /// Fetches the authoritative status of an order from the Core API.
    pub async fn transaction_status(&self, order_id: &str) -> Result<GatewayTransactionStatus> {
        if order_id.is_empty() {
            anyhow::bail!("order id is required");
        }

        let resp = self
            .http
            .get(self.api_base_url.join(&format!("v2/{order_id}/status"))?)
            .basic_auth(&self.server_key, Some(""))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "get transaction status").await?;

        let raw: serde_json::Value = resp.json().await?;
        let body: StatusBody = serde_json::from_value(raw.clone()).unwrap_or_default();

        // The Core API answers unknown orders with HTTP 200 and an error body.
        let transaction_status = match body.transaction_status {
            Some(status) if !status.is_empty() => status,
            _ => {
                error!(
                    %order_id,
                    midtrans_status_code = ?body.status_code,
                    midtrans_status_message = ?body.status_message,
                    "midtrans status response carries no transaction_status"
                );
                anyhow::bail!(
                    "Midtrans status lookup failed for {}: {}",
                    order_id,
                    body.status_message.unwrap_or_default()
                );
            }
        };

        Ok(GatewayTransactionStatus {
            transaction_id: body.transaction_id.unwrap_or_default(),
            order_id: body.order_id.unwrap_or_else(|| order_id.to_string()),
            transaction_status,
            fraud_status: body.fraud_status.unwrap_or_default(),
            payment_type: body.payment_type.unwrap_or_default(),
            gross_amount: body.gross_amount.unwrap_or_default(),
            status_code: body.status_code.unwrap_or_default(),
            status_message: body.status_message.unwrap_or_default(),
            raw,
        })
    }

    /// Hex SHA-512 of `order_id + status_code + gross_amount + server_key`.
    pub fn signature_for(&self, order_id: &str, status_code: &str, gross_amount: &str) -> String {
        let mut hasher = Sha512::new();
        hasher.update(order_id.as_bytes());
        hasher.update(status_code.as_bytes());
        hasher.update(gross_amount.as_bytes());
        hasher.update(self.server_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify_signature(
        &self,
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        signature_key: &str,
    ) -> bool {
        let expected = self.signature_for(order_id, status_code, gross_amount);
        expected.as_bytes().ct_eq(signature_key.as_bytes()).into()
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
