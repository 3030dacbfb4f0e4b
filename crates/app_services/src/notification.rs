//! Notification outbox
//!
//! Status-change events become `Notification`s once the unit of work that
//! produced them has committed. Delivery runs on spawned tasks; a failing
//! sink is logged and never reaches the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use core_kernel::{CompanyId, PortError};
use domain_adjustment::{AdjustmentEvent, AdjustmentEventKind};
use domain_calculation::{CalculationEvent, CalculationEventKind};

/// Who should see the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "companyId", rename_all = "snake_case")]
pub enum Audience {
    Company(CompanyId),
    /// Every staff user who reviews documents
    Reviewers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    StatusChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub audience: Audience,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// `calculation`, `refund` or `correction`
    pub document_kind: String,
    pub document_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

fn with_reason(text: String, comment: Option<&str>) -> String {
    match comment.map(str::trim).filter(|c| !c.is_empty()) {
        Some(reason) => format!("{}. Reason: {}", text, reason),
        None => text,
    }
}

impl Notification {
    fn calculation(event: &CalculationEvent, audience: Audience, severity: Severity, title: &str, message: String) -> Self {
        Self {
            audience,
            severity,
            title: title.to_string(),
            message,
            document_kind: "calculation".to_string(),
            document_id: *event.calculation_id.as_uuid(),
            occurred_at: event.occurred_at,
        }
    }

    /// Renders the messages for one calculation event
    pub fn for_calculation(event: &CalculationEvent, company_name: &str) -> Vec<Self> {
        let owner = Audience::Company(event.company_id);
        let number = &event.number;
        let comment = event.comment.as_deref();

        match event.kind {
            CalculationEventKind::Submitted | CalculationEventKind::Resubmitted => vec![
                Self::calculation(
                    event,
                    owner,
                    Severity::Info,
                    "Calculation sent",
                    format!("Calculation {} was sent for review", number),
                ),
                Self::calculation(
                    event,
                    Audience::Reviewers,
                    Severity::Info,
                    "New incoming calculation",
                    format!(
                        "New incoming calculation {} from {} for {}. Review required",
                        number, company_name, event.total_amount
                    ),
                ),
            ],
            CalculationEventKind::Approved => vec![Self::calculation(
                event,
                owner,
                Severity::Success,
                "Calculation approved",
                format!("Calculation {} approved. Charged {}", number, event.total_amount),
            )],
            CalculationEventKind::Rejected => vec![Self::calculation(
                event,
                owner,
                Severity::Warning,
                "Calculation rejected",
                with_reason(format!("Calculation {} rejected", number), comment),
            )],
            CalculationEventKind::PaymentSubmitted => vec![Self::calculation(
                event,
                Audience::Reviewers,
                Severity::Info,
                "Payment submitted",
                format!("{} submitted a payment for calculation {}. Confirmation required", company_name, number),
            )],
            CalculationEventKind::PaymentConfirmed => vec![Self::calculation(
                event,
                owner,
                Severity::Success,
                "Payment confirmed",
                format!("Payment for calculation {} confirmed. Status: {}", number, event.to),
            )],
            CalculationEventKind::PaymentRejected => vec![Self::calculation(
                event,
                owner,
                Severity::Warning,
                "Payment rejected",
                with_reason(format!("Payment for calculation {} rejected", number), comment),
            )],
            _ => vec![Self::calculation(
                event,
                owner,
                Severity::StatusChange,
                "Calculation status changed",
                format!("Calculation {} status changed from {} to {}", number, event.from, event.to),
            )],
        }
    }

    /// Renders the messages for one refund or correction event
    pub fn for_adjustment(event: &AdjustmentEvent, company_name: &str) -> Vec<Self> {
        let document = event.document.to_string();
        let build = |audience, severity, title: String, message: String| Self {
            audience,
            severity,
            title,
            message,
            document_kind: document.clone(),
            document_id: event.document_id,
            occurred_at: event.occurred_at,
        };
        let capitalized = match event.document {
            domain_adjustment::DocumentKind::Refund => "Refund",
            domain_adjustment::DocumentKind::Correction => "Correction",
        };

        match event.kind {
            AdjustmentEventKind::Requested => vec![build(
                Audience::Reviewers,
                Severity::Info,
                format!("New {} request", document),
                format!(
                    "New {} request {} from {} for {}. Review required",
                    document, event.number, company_name, event.amount
                ),
            )],
            AdjustmentEventKind::Approved => vec![build(
                Audience::Company(event.company_id),
                Severity::Success,
                format!("{} approved", capitalized),
                format!("{} {} approved. Amount {}", capitalized, event.number, event.amount),
            )],
            AdjustmentEventKind::Rejected => vec![build(
                Audience::Company(event.company_id),
                Severity::Warning,
                format!("{} rejected", capitalized),
                with_reason(format!("{} {} rejected", capitalized, event.number), event.comment.as_deref()),
            )],
        }
    }
}

/// Outbound delivery port
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: Notification) -> Result<(), PortError>;
}

/// Sink that only writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, notification: Notification) -> Result<(), PortError> {
        info!(
            audience = ?notification.audience,
            severity = ?notification.severity,
            title = %notification.title,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Sink that forwards notifications to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(&self, notification: Notification) -> Result<(), PortError> {
        self.sender
            .send(notification)
            .map_err(|_| PortError::connection("notification channel closed"))
    }
}

/// Fire-and-forget publisher used by the services after commit
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// Spawns one delivery per notification and returns immediately
    pub fn publish(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            let sink = Arc::clone(&self.sink);
            tokio::spawn(async move {
                let title = notification.title.clone();
                if let Err(e) = sink.deliver(notification).await {
                    warn!(error = %e, title = %title, "Notification delivery failed");
                }
            });
        }
    }

    pub fn calculation(&self, event: &CalculationEvent, company_name: &str) {
        self.publish(Notification::for_calculation(event, company_name));
    }

    pub fn adjustment(&self, event: &AdjustmentEvent, company_name: &str) {
        self.publish(Notification::for_adjustment(event, company_name));
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{CalculationId, Money};
    use domain_calculation::CalculationStatus;
    use rust_decimal_macros::dec;

    fn event(kind: CalculationEventKind, comment: Option<&str>) -> CalculationEvent {
        CalculationEvent {
            kind,
            calculation_id: CalculationId::new(),
            number: "CALC-2026-000001".to_string(),
            company_id: CompanyId::new(),
            from: CalculationStatus::UnderReview,
            to: CalculationStatus::Rejected,
            total_amount: Money::new(dec!(800)),
            comment: comment.map(str::to_string),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn test_submission_notifies_owner_and_reviewers() {
        let notifications = Notification::for_calculation(&event(CalculationEventKind::Submitted, None), "Eco Plast");
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[1].audience, Audience::Reviewers);
        assert_eq!(
            notifications[1].message,
            "New incoming calculation CALC-2026-000001 from Eco Plast for 800.00. Review required"
        );
    }

    #[test]
    fn test_rejection_carries_reason() {
        let notifications =
            Notification::for_calculation(&event(CalculationEventKind::Rejected, Some("wrong weight")), "Eco Plast");
        assert_eq!(notifications[0].severity, Severity::Warning);
        assert!(notifications[0].message.ends_with("Reason: wrong weight"));
    }

    #[tokio::test]
    async fn test_channel_sink_receives_published_notifications() {
        let (sink, mut receiver) = ChannelSink::new();
        let notifier = Notifier::new(Arc::new(sink));
        notifier.calculation(&event(CalculationEventKind::Approved, None), "Eco Plast");

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.title, "Calculation approved");
    }
}
