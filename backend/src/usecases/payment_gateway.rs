use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::payments::midtrans_client::{
    GatewayTransactionStatus, MidtransClient, SnapSession, SnapTransactionRequest,
};

/// Port to the hosted-payment provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_hosted_session(&self, request: SnapTransactionRequest)
    -> AnyResult<SnapSession>;

    async fn query_status(&self, order_id: &str) -> AnyResult<GatewayTransactionStatus>;

    fn client_key(&self) -> String;

    fn verify_signature(
        &self,
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        signature_key: &str,
    ) -> bool;
}

#[async_trait]
impl PaymentGateway for MidtransClient {
    async fn create_hosted_session(
        &self,
        request: SnapTransactionRequest,
    ) -> AnyResult<SnapSession> {
        self.create_snap_transaction(&request).await
    }

    async fn query_status(&self, order_id: &str) -> AnyResult<GatewayTransactionStatus> {
        self.transaction_status(order_id).await
    }

    fn client_key(&self) -> String {
        MidtransClient::client_key(self).to_string()
    }

    fn verify_signature(
        &self,
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        signature_key: &str,
    ) -> bool {
        MidtransClient::verify_signature(self, order_id, status_code, gross_amount, signature_key)
    }
}
