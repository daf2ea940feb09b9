//! Terminal rendering utilities.

use clinicbridge_channels::SessionManager;
use clinicbridge_core::{DeliveryRecord, DeliveryStatus, SessionState};
use console::style;
use std::sync::Arc;

/// Print the pairing code banner on stderr.
pub fn render_pairing_banner(code: &str) {
    let rule = "=".repeat(48);
    eprintln!();
    eprintln!("{}", style(&rule).yellow());
    eprintln!("  {}", style("Pairing required").yellow().bold());
    eprintln!("  Link this gateway from the phone app with the code:");
    eprintln!();
    eprintln!("    {}", style(code).bold());
    eprintln!();
    eprintln!("{}", style(&rule).yellow());
    eprintln!();
}

/// Follow session state changes and report the ones an operator acts on.
///
/// Returns when the session reaches a terminal state or the manager is dropped.
pub async fn watch_session(session: Arc<SessionManager>) {
    let mut states = session.subscribe();
    loop {
        let state = *states.borrow_and_update();
        match state {
            SessionState::AwaitingPairing => {
                if let Some(code) = session.pairing_code() {
                    render_pairing_banner(&code);
                }
            }
            SessionState::Connected => {
                eprintln!("{} Session connected", style("*").green());
            }
            SessionState::LoggedOut => {
                eprintln!(
                    "{} Session logged out. Restart to pair again.",
                    style("x").red()
                );
            }
            _ => {}
        }

        if state.is_terminal() || states.changed().await.is_err() {
            break;
        }
    }
}

/// Styled label for a session state.
pub fn state_label(state: SessionState) -> String {
    let text = state.as_str();
    match state {
        SessionState::Connected => style(text).green().to_string(),
        SessionState::AwaitingPairing | SessionState::Reconnecting => {
            style(text).yellow().to_string()
        }
        SessionState::Initializing => style(text).dim().to_string(),
        SessionState::Disconnected | SessionState::LoggedOut => style(text).red().to_string(),
    }
}

/// One line per record: time, outcome, kind, recipient and any error.
pub fn format_record(record: &DeliveryRecord) -> String {
    let status = match record.status {
        DeliveryStatus::Sent => "sent  ",
        DeliveryStatus::Failed => "FAILED",
    };
    let mut line = format!(
        "{}  {}  {:<7}  {}",
        record.sent_at.format("%Y-%m-%d %H:%M:%S"),
        status,
        record.kind.as_str(),
        record.phone,
    );
    if let Some(error) = &record.error_message {
        line.push_str("  ");
        line.push_str(error);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinicbridge_core::NotificationKind;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_failed_record() {
        let record = DeliveryRecord::failed(
            NotificationKind::Payment,
            "0501234567",
            "966501234567@c.us",
            BTreeMap::new(),
            "number not on network",
        );
        let line = format_record(&record);
        assert!(line.contains("FAILED"));
        assert!(line.contains("payment"));
        assert!(line.contains("0501234567"));
        assert!(line.ends_with("number not on network"));
    }

    #[test]
    fn test_format_sent_record_has_no_error() {
        let record = DeliveryRecord::sent(
            NotificationKind::Booking,
            "0791234567",
            "962791234567@c.us",
            BTreeMap::new(),
        );
        let line = format_record(&record);
        assert!(line.contains("sent"));
        assert!(line.ends_with("0791234567"));
    }
}
