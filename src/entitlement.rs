// 👑 Entitlement - paid plans and the checkout collaborator
// Checkout is not wired to a payment provider; the stub only reports what it would charge

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Plan {
    Monthly,
    OneTime,
}

impl Plan {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "monthly" | "subscription" => Some(Plan::Monthly),
            "one-time" | "onetime" | "pass" => Some(Plan::OneTime),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Plan::Monthly => "Monthly",
            Plan::OneTime => "One-Time",
        }
    }

    pub fn price_label(&self) -> &'static str {
        match self {
            Plan::Monthly => "$9.99/month",
            Plan::OneTime => "$39.99 one-time",
        }
    }

    pub fn features(&self) -> &'static [&'static str] {
        match self {
            Plan::Monthly => &[
                "Unlimited document scans",
                "Full legal dispute library",
                "ChexSystems forms",
                "AI-powered analysis",
                "Monthly credit tips",
            ],
            Plan::OneTime => &[
                "Everything in monthly",
                "30 days of full access",
                "No recurring charges",
                "Download all forms",
                "Priority support",
            ],
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No payment provider behind this backend
    #[error("This would connect to Stripe with price ID: {price_id}")]
    NotConnected { price_id: String },
}

/// Receipt for a completed purchase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Purchase {
    pub plan: Plan,
    pub reference: String,
}

/// Payment collaborator. Subscription and one-time purchase are separate flows.
pub trait CheckoutBackend: Send + Sync {
    fn subscribe(&self, price_id: &str) -> Result<Purchase, CheckoutError>;

    fn purchase_pass(&self, price_id: &str) -> Result<Purchase, CheckoutError>;
}

/// Placeholder backend: never charges, always reports the price it would use.
#[derive(Debug, Clone)]
pub struct StubCheckout {
    pub monthly_price_id: String,
    pub one_time_price_id: String,
}

impl StubCheckout {
    pub fn new(monthly_price_id: &str, one_time_price_id: &str) -> Self {
        Self {
            monthly_price_id: monthly_price_id.to_string(),
            one_time_price_id: one_time_price_id.to_string(),
        }
    }

    /// Route a plan to its flow with the configured price id
    pub fn checkout(&self, plan: Plan) -> Result<Purchase, CheckoutError> {
        match plan {
            Plan::Monthly => self.subscribe(&self.monthly_price_id),
            Plan::OneTime => self.purchase_pass(&self.one_time_price_id),
        }
    }
}

impl CheckoutBackend for StubCheckout {
    fn subscribe(&self, price_id: &str) -> Result<Purchase, CheckoutError> {
        tracing::info!(price_id, flow = "subscription", "checkout requested (stub)");
        Err(CheckoutError::NotConnected {
            price_id: price_id.to_string(),
        })
    }

    fn purchase_pass(&self, price_id: &str) -> Result<Purchase, CheckoutError> {
        tracing::info!(price_id, flow = "one-time", "checkout requested (stub)");
        Err(CheckoutError::NotConnected {
            price_id: price_id.to_string(),
        })
    }
}
