//! Delivery coordination.
//!
//! [`DeliveryCoordinator::deliver`] runs one notification request through
//! the readiness gate, validation, phone normalization and rendering, sends
//! it through the session, and records the outcome. Exactly one audit record
//! is written for every attempt that reaches the transport. Requests that
//! are rejected before that point leave the log untouched.

use crate::audit::AuditLog;
use crate::error::{DeliveryError, ValidationError};
use crate::template::{RenderedMessage, TemplateEngine};
use clinicbridge_channels::{phone, ChannelError, SendReceipt, SessionManager};
use clinicbridge_core::config::NotificationsConfig;
use clinicbridge_core::{DeliveryRecord, NotificationRequest};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of a successful delivery.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    /// The audit record written for this attempt.
    pub record: DeliveryRecord,

    /// Transport receipt.
    pub receipt: SendReceipt,

    /// The message body that was sent.
    pub body: String,
}

/// Serves notification requests against the session.
#[derive(Debug)]
pub struct DeliveryCoordinator {
    session: Arc<SessionManager>,
    audit: Arc<AuditLog>,
    templates: TemplateEngine,
    default_country_code: String,
}

impl DeliveryCoordinator {
    pub fn new(
        session: Arc<SessionManager>,
        audit: Arc<AuditLog>,
        templates: TemplateEngine,
        default_country_code: impl Into<String>,
    ) -> Self {
        Self {
            session,
            audit,
            templates,
            default_country_code: default_country_code.into(),
        }
    }

    /// Build from the `notifications` config section.
    pub fn from_config(
        config: &NotificationsConfig,
        session: Arc<SessionManager>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self::new(
            session,
            audit,
            TemplateEngine::new(config.currency.clone()),
            config.default_country_code.clone(),
        )
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// Render and send one notification.
    pub async fn deliver(
        &self,
        request: &NotificationRequest,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let state = self.session.current_state();
        if !state.is_ready() {
            warn!(%state, kind = %request.kind(), "rejecting notification, session not ready");
            return Err(DeliveryError::NotConnected(state));
        }

        if request.phone.trim().is_empty() {
            return Err(ValidationError::MissingField("phone").into());
        }
        let RenderedMessage { body, fields } = self.templates.render(&request.details)?;

        let country_code = request.country_code_or(&self.default_country_code);
        let recipient = phone::normalize(&request.phone, country_code);
        let kind = request.kind();

        match self.session.send_text(&recipient, &body).await {
            Ok(receipt) => {
                let record = DeliveryRecord::sent(kind, &request.phone, &recipient, fields);
                self.record(record.clone()).await?;
                info!(%kind, %recipient, id = %record.id, "notification sent");
                Ok(DeliveryOutcome {
                    record,
                    receipt,
                    body,
                })
            }
            Err(ChannelError::NotConnected(state)) => {
                warn!(%state, %kind, "session lost readiness before send");
                Err(DeliveryError::NotConnected(state))
            }
            Err(e) => {
                let message = transport_message(&e);
                warn!(%kind, %recipient, error = %message, "notification failed");

                let record =
                    DeliveryRecord::failed(kind, &request.phone, &recipient, fields, &message);
                if let Err(audit_err) = self.record(record).await {
                    error!(error = %audit_err, "failed delivery could not be recorded");
                }
                Err(DeliveryError::Transport(message))
            }
        }
    }

    async fn record(&self, record: DeliveryRecord) -> Result<(), DeliveryError> {
        self.audit.append(record).await.map_err(|e| {
            error!(error = %e, "failed to append to audit log");
            DeliveryError::from(e)
        })
    }
}

fn transport_message(e: &ChannelError) -> String {
    match e {
        ChannelError::Transport(message) => message.clone(),
        other => other.to_string(),
    }
}
