//! Payment gateway collaborator.
//!
//! The core never trusts a client-held callback payload: the verdict for
//! a reference is always fetched from the provider before anything
//! commits.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Details the gateway needs to start collecting payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatePayment {
    /// Amount in minor currency units.
    pub amount: u64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub customer_name: String,
    pub phone_number: String,
}

/// Reference handed back when payment collection starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub reference: String,
}

/// The provider's verdict for a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub reference: String,
    /// Raw status string as reported by the provider.
    pub status: String,
}

impl PaymentEvent {
    /// Any status other than a case-insensitive success variant counts as
    /// failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("successful") || self.status.eq_ignore_ascii_case("completed")
    }
}

#[derive(Debug, Error)]
pub enum PaymentGatewayError {
    #[error("payment provider request failed")]
    Transport(#[source] reqwest::Error),

    #[error("payment provider error: {0}")]
    Provider(String),

    /// The provider has no verdict for the reference yet; the buyer may
    /// have abandoned the payment step.
    #[error("no confirmation received for reference {0:?}")]
    Unconfirmed(String),
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start collecting payment; returns the reference for this attempt.
    async fn initiate(&self, payment: InitiatePayment) -> Result<PaymentIntent, PaymentGatewayError>;

    /// Fetch the provider's verdict for a reference.
    async fn verify(&self, reference: &str) -> Result<PaymentEvent, PaymentGatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    next_id: u32,
    initiated: Vec<String>,
    verdicts: FxHashMap<String, String>,
    default_status: Option<String>,
    fail_on_initiate: bool,
}

/// In-memory payment gateway for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway with no scripted verdicts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every initiated payment with the given status.
    pub fn resolve_all(&self, status: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.default_status = Some(status.to_string());
    }

    /// Script a verdict for one reference.
    pub fn resolve(&self, reference: &str, status: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state
            .verdicts
            .insert(reference.to_string(), status.to_string());
    }

    /// Configure the gateway to reject the next initiation.
    pub fn set_fail_on_initiate(&self, fail: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.fail_on_initiate = fail;
    }

    /// Number of payments initiated so far.
    #[must_use]
    pub fn initiated_count(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.initiated.len()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn initiate(&self, _payment: InitiatePayment) -> Result<PaymentIntent, PaymentGatewayError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_initiate {
            return Err(PaymentGatewayError::Provider(
                "initiation rejected".to_string(),
            ));
        }

        state.next_id += 1;
        let reference = format!("KRL-{:06}", state.next_id);
        state.initiated.push(reference.clone());

        Ok(PaymentIntent { reference })
    }

    async fn verify(&self, reference: &str) -> Result<PaymentEvent, PaymentGatewayError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(status) = state.verdicts.get(reference) {
            return Ok(PaymentEvent {
                reference: reference.to_string(),
                status: status.clone(),
            });
        }

        if state.initiated.iter().any(|r| r == reference) {
            if let Some(status) = &state.default_status {
                return Ok(PaymentEvent {
                    reference: reference.to_string(),
                    status: status.clone(),
                });
            }
        }

        Err(PaymentGatewayError::Unconfirmed(reference.to_string()))
    }
}

/// Gateway backed by the provider's verify-by-reference HTTP API.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: String,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    tx_ref: String,
    status: String,
}

impl HttpPaymentGateway {
    #[must_use]
    pub fn new(base_url: String, secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn initiate(&self, payment: InitiatePayment) -> Result<PaymentIntent, PaymentGatewayError> {
        // The provider expects amounts in major units.
        let amount = format!("{}.{:02}", payment.amount / 100, payment.amount % 100);
        let reference = format!("kraal-{}", Uuid::now_v7().simple());

        let response = self
            .client
            .post(format!("{}/payments", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&serde_json::json!({
                "tx_ref": reference,
                "amount": amount,
                "currency": payment.currency,
                "customer": {
                    "email": payment.customer_email,
                    "name": payment.customer_name,
                    "phonenumber": payment.phone_number,
                },
            }))
            .send()
            .await
            .map_err(PaymentGatewayError::Transport)?;

        if !response.status().is_success() {
            return Err(PaymentGatewayError::Provider(format!(
                "initiation returned {}",
                response.status()
            )));
        }

        Ok(PaymentIntent { reference })
    }

    async fn verify(&self, reference: &str) -> Result<PaymentEvent, PaymentGatewayError> {
        let response = self
            .client
            .get(format!(
                "{}/transactions/verify_by_reference",
                self.base_url
            ))
            .query(&[("tx_ref", reference)])
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(PaymentGatewayError::Transport)?;

        if !response.status().is_success() {
            return Err(PaymentGatewayError::Provider(format!(
                "verification returned {}",
                response.status()
            )));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(PaymentGatewayError::Transport)?;

        if !body.status.eq_ignore_ascii_case("success") {
            return Err(PaymentGatewayError::Provider(body.status));
        }

        let Some(data) = body.data else {
            return Err(PaymentGatewayError::Unconfirmed(reference.to_string()));
        };

        Ok(PaymentEvent {
            reference: data.tx_ref,
            status: data.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn payment() -> InitiatePayment {
        InitiatePayment {
            amount: 150_000,
            currency: "NGN".to_string(),
            customer_email: Some("amina@example.com".to_string()),
            customer_name: "Amina Bello".to_string(),
            phone_number: "+2348012345678".to_string(),
        }
    }

    #[tokio::test]
    async fn success_statuses_are_case_insensitive() {
        for status in ["successful", "SUCCESSFUL", "Completed", "completed"] {
            let event = PaymentEvent {
                reference: "KRL-000001".to_string(),
                status: status.to_string(),
            };
            assert!(event.is_success(), "{status} should count as success");
        }

        for status in ["failed", "pending", "cancelled", ""] {
            let event = PaymentEvent {
                reference: "KRL-000001".to_string(),
                status: status.to_string(),
            };
            assert!(!event.is_success(), "{status} should count as failure");
        }
    }

    #[tokio::test]
    async fn initiate_assigns_sequential_references() -> TestResult {
        let gateway = InMemoryPaymentGateway::new();

        let first = gateway.initiate(payment()).await?;
        let second = gateway.initiate(payment()).await?;

        assert_eq!(first.reference, "KRL-000001");
        assert_eq!(second.reference, "KRL-000002");
        assert_eq!(gateway.initiated_count(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn verify_without_verdict_is_unconfirmed() -> TestResult {
        let gateway = InMemoryPaymentGateway::new();
        let intent = gateway.initiate(payment()).await?;

        let result = gateway.verify(&intent.reference).await;

        assert!(
            matches!(result, Err(PaymentGatewayError::Unconfirmed(ref r)) if *r == intent.reference),
            "expected Unconfirmed, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn scripted_verdict_wins_over_default() -> TestResult {
        let gateway = InMemoryPaymentGateway::new();
        let intent = gateway.initiate(payment()).await?;

        gateway.resolve_all("successful");
        gateway.resolve(&intent.reference, "failed");

        let event = gateway.verify(&intent.reference).await?;
        assert!(!event.is_success());

        Ok(())
    }
}
