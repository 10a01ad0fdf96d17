use std::sync::Arc;

use chrono::Utc;
use quire_core::address::{Address, Parcel};
use quire_delivery::aggregator::DeliveryError;
use quire_delivery::DeliveryQuoteAggregator;
use quire_order::commitment::CommitmentError;
use quire_order::{CommitmentTracker, Order, OrderDraft};
use quire_settlement::{CaptureError, SettlementGateway};
use uuid::Uuid;

use crate::session::{CheckoutSession, CheckoutStep, ItemSelection};

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("At least one item is required")]
    EmptyItems,
    #[error("Shipping address is missing or incomplete")]
    AddressIncomplete,
    #[error("No delivery option selected")]
    NoQuoteSelected,
    #[error("Selected delivery option is not one of the offered quotes")]
    QuoteNotFound,
    #[error("A payment attempt is already in progress")]
    CaptureInProgress,
    #[error("Checkout already completed")]
    SessionComplete,
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Commitment(#[from] CommitmentError),
}

impl CheckoutError {
    /// User-facing messages are reduced to a small stable set; the full
    /// error goes to the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            CheckoutError::Capture(CaptureError::SellerSetupIncomplete) => {
                "The seller's payment setup is incomplete."
            }
            CheckoutError::Capture(CaptureError::InvalidBankDetails(_)) => {
                "The seller's bank details were rejected."
            }
            CheckoutError::Capture(CaptureError::GatewayUnavailable(_)) => {
                "Payments are temporarily unavailable. Please try again."
            }
            CheckoutError::Capture(CaptureError::DuplicateCharge(_)) => {
                "This payment was already processed."
            }
            _ => "Please complete the current step before continuing.",
        }
    }
}

/// Drives a buyer through items -> shipping -> delivery -> payment as an
/// explicit state machine. Every guard failure leaves the session exactly
/// as it was; only a successful capture changes durable state.
pub struct CheckoutOrchestrator {
    aggregator: Arc<DeliveryQuoteAggregator>,
    settlement: Arc<SettlementGateway>,
    tracker: Arc<CommitmentTracker>,
    currency: String,
}

impl CheckoutOrchestrator {
    pub fn new(
        aggregator: Arc<DeliveryQuoteAggregator>,
        settlement: Arc<SettlementGateway>,
        tracker: Arc<CommitmentTracker>,
        currency: String,
    ) -> Self {
        Self {
            aggregator,
            settlement,
            tracker,
            currency,
        }
    }

    /// Open a fresh session at the Items step.
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        &self,
        buyer_id: String,
        buyer_email: String,
        seller_id: String,
        seller_email: String,
        seller_subaccount: Option<String>,
        pickup_address: Address,
    ) -> CheckoutSession {
        CheckoutSession {
            id: Uuid::new_v4(),
            buyer_id,
            buyer_email,
            seller_id,
            seller_email,
            seller_subaccount,
            pickup_address,
            step: CheckoutStep::Items,
            items: Vec::new(),
            shipping_address: None,
            quotes: Vec::new(),
            quoted_fingerprint: None,
            selected_quote: None,
            payment_reference: None,
            processing: false,
            last_error: None,
            completed_order: None,
            created_at: Utc::now(),
        }
    }

    /// Replace the item set. Only valid while on the Items step.
    pub fn set_items(
        &self,
        session: &mut CheckoutSession,
        items: Vec<ItemSelection>,
    ) -> Result<(), CheckoutError> {
        self.ensure_open(session)?;
        if session.step != CheckoutStep::Items {
            return Err(CheckoutError::InvalidTransition {
                from: session.step.as_str(),
                to: "ITEMS",
            });
        }
        session.items = items;
        Ok(())
    }

    /// Set or replace the shipping address. A changed address invalidates
    /// any cached quotes and the previous selection.
    pub fn set_shipping_address(
        &self,
        session: &mut CheckoutSession,
        address: Address,
    ) -> Result<(), CheckoutError> {
        self.ensure_open(session)?;
        if session.step != CheckoutStep::Shipping {
            return Err(CheckoutError::InvalidTransition {
                from: session.step.as_str(),
                to: "SHIPPING",
            });
        }
        if !address.is_complete() {
            return Err(CheckoutError::AddressIncomplete);
        }

        let changed = session
            .shipping_address
            .as_ref()
            .map(|current| current.fingerprint() != address.fingerprint())
            .unwrap_or(true);
        session.shipping_address = Some(address);
        if changed {
            session.quotes.clear();
            session.quoted_fingerprint = None;
            session.selected_quote = None;
        }
        Ok(())
    }

    /// Move forward one step, enforcing the guard for the step being left.
    /// Entering Delivery fetches quotes, exactly once per address pair.
    pub async fn advance(&self, session: &mut CheckoutSession) -> Result<(), CheckoutError> {
        self.ensure_open(session)?;
        let next = session.step.next().ok_or(CheckoutError::InvalidTransition {
            from: session.step.as_str(),
            to: "PAYMENT",
        })?;

        match session.step {
            CheckoutStep::Items => {
                if session.items.is_empty() {
                    return Err(CheckoutError::EmptyItems);
                }
            }
            CheckoutStep::Shipping => {
                let complete = session
                    .shipping_address
                    .as_ref()
                    .map(Address::is_complete)
                    .unwrap_or(false);
                if !complete {
                    return Err(CheckoutError::AddressIncomplete);
                }
            }
            CheckoutStep::Delivery => {
                if session.selected_quote.is_none() {
                    return Err(CheckoutError::NoQuoteSelected);
                }
            }
            CheckoutStep::Payment => unreachable!("next() returned None above"),
        }

        if next == CheckoutStep::Delivery {
            self.refresh_quotes(session).await?;
        }
        session.step = next;
        session.last_error = None;
        Ok(())
    }

    /// Move back one step. Never fails validation; backward movement keeps
    /// all entered state.
    pub fn back(&self, session: &mut CheckoutSession) -> Result<(), CheckoutError> {
        self.ensure_open(session)?;
        if session.processing {
            return Err(CheckoutError::CaptureInProgress);
        }
        let previous = session
            .step
            .previous()
            .ok_or(CheckoutError::InvalidTransition {
                from: session.step.as_str(),
                to: "ITEMS",
            })?;
        session.step = previous;
        Ok(())
    }

    /// Select one of the offered quotes by carrier and service name.
    pub fn select_quote(
        &self,
        session: &mut CheckoutSession,
        carrier_id: &str,
        service_name: &str,
    ) -> Result<(), CheckoutError> {
        self.ensure_open(session)?;
        if session.step != CheckoutStep::Delivery {
            return Err(CheckoutError::InvalidTransition {
                from: session.step.as_str(),
                to: "DELIVERY",
            });
        }
        let quote = session
            .quotes
            .iter()
            .find(|q| q.carrier_id == carrier_id && q.service_name == service_name)
            .cloned()
            .ok_or(CheckoutError::QuoteNotFound)?;
        session.selected_quote = Some(quote);
        Ok(())
    }

    /// Capture payment and open the commitment window. On success the
    /// session is complete; on failure it stays on Payment with its state
    /// untouched so the buyer can retry or go back.
    pub async fn pay(&self, session: &mut CheckoutSession) -> Result<Order, CheckoutError> {
        self.ensure_open(session)?;
        if session.step != CheckoutStep::Payment {
            return Err(CheckoutError::InvalidTransition {
                from: session.step.as_str(),
                to: "PAYMENT",
            });
        }
        if session.processing {
            return Err(CheckoutError::CaptureInProgress);
        }
        let quote = session
            .selected_quote
            .clone()
            .ok_or(CheckoutError::NoQuoteSelected)?;
        let item = session
            .items
            .first()
            .cloned()
            .ok_or(CheckoutError::EmptyItems)?;

        // One reference per logical attempt: generated on the first try and
        // reused on retries so the gateway's idempotency applies.
        let reference = session
            .payment_reference
            .get_or_insert_with(|| format!("co_{}", Uuid::new_v4().simple()))
            .clone();

        session.processing = true;
        let result = self
            .settlement
            .capture(
                &session.buyer_email,
                session.seller_subaccount.as_deref(),
                session.total_cents(),
                &reference,
            )
            .await;
        session.processing = false;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if !e.is_retryable() {
                    // Terminal for this attempt; a fresh attempt gets a
                    // fresh reference.
                    session.payment_reference = None;
                }
                let err = CheckoutError::from(e);
                session.last_error = Some(err.user_message().to_string());
                return Err(err);
            }
        };

        let draft = OrderDraft {
            buyer_id: session.buyer_id.clone(),
            buyer_email: session.buyer_email.clone(),
            seller_id: session.seller_id.clone(),
            seller_email: session.seller_email.clone(),
            item_id: item.item_id,
            item_title: item.title.clone(),
            delivery_fee_cents: quote.price_cents,
            currency: self.currency.clone(),
            delivery_carrier: quote.carrier_id.clone(),
            delivery_service: quote.service_name.clone(),
            subaccount_code: session
                .seller_subaccount
                .clone()
                .unwrap_or_default(),
        };

        let order = self
            .tracker
            .open_commitment(&draft, &outcome.payment_reference, outcome.split)
            .await?;

        session.completed_order = Some(order.id);
        session.last_error = None;
        tracing::info!(
            session_id = %session.id,
            order_id = %order.id,
            "checkout completed"
        );
        Ok(order)
    }

    fn ensure_open(&self, session: &CheckoutSession) -> Result<(), CheckoutError> {
        if session.completed_order.is_some() {
            return Err(CheckoutError::SessionComplete);
        }
        Ok(())
    }

    async fn refresh_quotes(&self, session: &mut CheckoutSession) -> Result<(), CheckoutError> {
        let fingerprint = session.address_pair_fingerprint();
        if fingerprint.is_some() && fingerprint == session.quoted_fingerprint {
            return Ok(());
        }
        let to = session
            .shipping_address
            .clone()
            .ok_or(CheckoutError::AddressIncomplete)?;

        let quotes = self
            .aggregator
            .get_quotes(&session.pickup_address, &to, &Parcel::standard_textbook())
            .await?;
        session.quotes = quotes;
        session.quoted_fingerprint = fingerprint;
        session.selected_quote = None;
        Ok(())
    }
}
