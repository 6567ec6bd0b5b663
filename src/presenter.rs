//! Alert Presentation
//!
//! Turns `{ connection_status, retry_error, alerts }` into the status banner,
//! alert cards and error notice, and renders them for a terminal.

use chrono::{Local, TimeZone};
use serde::Serialize;
use std::fmt::Write;

use crate::alerts::AlertRecord;
use crate::connection::{ConnectionState, ConnectionStatus};

/// Message shown while the retry budget is spent or a socket error is pending
pub const CONNECTION_ERROR_NOTICE: &str =
    "Unable to connect to server. Please check if the server is running.";

/// Visual weight of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Success,
    Error,
}

impl Severity {
    /// Severity for an alert type; unknown types are informational
    pub fn for_kind(kind: &str) -> Self {
        match kind {
            "person" => Severity::Info,
            "car" => Severity::Warning,
            "dog" | "pet_owner" => Severity::Success,
            _ => Severity::Info,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Success => "SUCCESS",
            Severity::Error => "ERROR",
        }
    }
}

/// What the rendering side consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertView {
    pub connection_status: ConnectionStatus,
    pub retry_error: bool,
    pub alerts: Vec<AlertRecord>,
}

/// Banner shown whenever the connection is not up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBanner {
    pub message: &'static str,
    /// Offer the manual retry action
    pub show_retry: bool,
}

/// One rendered alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertCard {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub detail: String,
}

impl AlertView {
    pub fn new(state: &ConnectionState, alerts: Vec<AlertRecord>) -> Self {
        Self {
            connection_status: state.status,
            retry_error: state.last_error,
            alerts,
        }
    }

    pub fn status_banner(&self) -> Option<StatusBanner> {
        let message = match self.connection_status {
            ConnectionStatus::Connected => return None,
            ConnectionStatus::Connecting => "Connecting to server...",
            ConnectionStatus::Error => "Connection failed",
            ConnectionStatus::Disconnected => "Disconnected from server",
        };
        Some(StatusBanner {
            message,
            show_retry: self.retry_error,
        })
    }

    pub fn cards(&self) -> Vec<AlertCard> {
        self.alerts.iter().map(AlertCard::from_alert).collect()
    }

    pub fn error_notice(&self) -> Option<&'static str> {
        self.retry_error.then_some(CONNECTION_ERROR_NOTICE)
    }
}

impl AlertCard {
    pub fn from_alert(alert: &AlertRecord) -> Self {
        Self {
            severity: Severity::for_kind(&alert.kind),
            title: detection_title(&alert.kind),
            message: alert.message.clone(),
            detail: format!("{} - {} side", local_time(alert.timestamp), alert.position),
        }
    }
}

/// "car" -> "Car Detected"
pub fn detection_title(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => format!("{}{} Detected", first.to_uppercase(), chars.as_str()),
        None => "Detected".to_string(),
    }
}

fn local_time(timestamp: i64) -> String {
    match Local.timestamp_opt(timestamp, 0).single() {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => timestamp.to_string(),
    }
}

/// Plain-text rendering for the terminal monitor
pub fn render(view: &AlertView) -> String {
    let mut out = String::new();

    if let Some(banner) = view.status_banner() {
        let _ = write!(out, "[!] Connection Status: {}", banner.message);
        if banner.show_retry {
            out.push_str("  (r + Enter to retry)");
        }
        out.push('\n');
    }

    if view.alerts.is_empty() {
        out.push_str("    no alerts yet\n");
    }
    for card in view.cards() {
        let _ = writeln!(out, "[{}] {}", card.severity.label(), card.title);
        let _ = writeln!(out, "    {}", card.message);
        let _ = writeln!(out, "    {}", card.detail);
    }

    if let Some(notice) = view.error_notice() {
        let _ = writeln!(
            out,
            "[{}] {}  (d + Enter to dismiss)",
            Severity::Error.label(),
            notice
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: ConnectionStatus, last_error: bool) -> ConnectionState {
        ConnectionState {
            status,
            retry_count: 0,
            last_error,
        }
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(Severity::for_kind("person"), Severity::Info);
        assert_eq!(Severity::for_kind("car"), Severity::Warning);
        assert_eq!(Severity::for_kind("dog"), Severity::Success);
        assert_eq!(Severity::for_kind("pet_owner"), Severity::Success);
        assert_eq!(Severity::for_kind("bicycle"), Severity::Info);
    }

    #[test]
    fn test_detection_title() {
        assert_eq!(detection_title("car"), "Car Detected");
        assert_eq!(detection_title("pet_owner"), "Pet_owner Detected");
        assert_eq!(detection_title(""), "Detected");
    }

    #[test]
    fn test_banner_hidden_when_connected() {
        let view = AlertView::new(&state(ConnectionStatus::Connected, false), vec![]);
        assert!(view.status_banner().is_none());
        assert!(view.error_notice().is_none());
    }

    #[test]
    fn test_banner_messages() {
        let cases = [
            (ConnectionStatus::Connecting, "Connecting to server..."),
            (ConnectionStatus::Error, "Connection failed"),
            (ConnectionStatus::Disconnected, "Disconnected from server"),
        ];
        for (status, expected) in cases {
            let banner = AlertView::new(&state(status, false), vec![])
                .status_banner()
                .unwrap();
            assert_eq!(banner.message, expected);
            assert!(!banner.show_retry);
        }
    }

    #[test]
    fn test_retry_offered_with_error_flag() {
        let view = AlertView::new(&state(ConnectionStatus::Disconnected, true), vec![]);
        assert!(view.status_banner().unwrap().show_retry);
        assert_eq!(view.error_notice(), Some(CONNECTION_ERROR_NOTICE));

        let text = render(&view);
        assert!(text.contains("Disconnected from server"));
        assert!(text.contains("r + Enter to retry"));
        assert!(text.contains(CONNECTION_ERROR_NOTICE));
    }

    #[test]
    fn test_card_from_alert() {
        let alert = AlertRecord::new("car", "Car detected left", "left", 1700000000);
        let card = AlertCard::from_alert(&alert);
        assert_eq!(card.severity, Severity::Warning);
        assert_eq!(card.title, "Car Detected");
        assert_eq!(card.message, "Car detected left");
        assert!(card.detail.ends_with(" - left side"));
    }

    #[test]
    fn test_render_lists_alerts_in_order() {
        let alerts = vec![
            AlertRecord::new("dog", "Notice: Animal detected on the right.", "right", 20),
            AlertRecord::new("person", "Notice: A pedestrian is noticed on the left.", "left", 10),
        ];
        let view = AlertView::new(&state(ConnectionStatus::Connected, false), alerts);
        let text = render(&view);

        let dog = text.find("Dog Detected").unwrap();
        let person = text.find("Person Detected").unwrap();
        assert!(dog < person);
        assert!(!text.contains("Connection Status"));
    }

    #[test]
    fn test_view_serializes_for_renderers() {
        let view = AlertView::new(&state(ConnectionStatus::Error, true), vec![]);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["connection_status"], "error");
        assert_eq!(json["retry_error"], true);
        assert!(json["alerts"].as_array().unwrap().is_empty());
    }
}
