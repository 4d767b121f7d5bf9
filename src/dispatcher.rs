use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::{DELIVERIES, SEND_LATENCY};
use crate::models::{DeliveryReceipt, OutboundMessage};
use crate::transport::{SendError, Transport};
use crate::validation::LocationReport;

/// Turns a validated report into an email and hands it to the transport once.
pub struct NotificationDispatcher {
    transport: Arc<dyn Transport>,
    maps_base_url: String,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn Transport>, maps_base_url: &str) -> Self {
        Self {
            transport,
            maps_base_url: maps_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    // Supplied link wins, otherwise "<base>/?q=<lat>,<lon>"
    pub fn map_url(&self, report: &LocationReport) -> String {
        match &report.map_url {
            Some(url) => url.to_string(),
            None => format!(
                "{}/?q={},{}",
                self.maps_base_url, report.latitude, report.longitude
            ),
        }
    }

    pub fn compose(&self, report: &LocationReport, received_at: DateTime<Utc>) -> OutboundMessage {
        let map_url = self.map_url(report);
        let received = received_at.to_rfc3339_opts(SecondsFormat::Secs, true);

        let text = format!(
            "New location received\n\n\
             Device: {}\nLatitude: {}\nLongitude: {}\nMap: {}\nReceived: {}\n",
            report.device_id, report.latitude, report.longitude, map_url, received
        );
        let html = format!(
            "<p><strong>New location received</strong></p>\
             <p>Device: {}</p>\
             <p>Latitude: {}</p>\
             <p>Longitude: {}</p>\
             <p><a href=\"{}\">Open map</a></p>\
             <p>Received: {}</p>",
            escape_html(&report.device_id),
            report.latitude,
            report.longitude,
            escape_html(&map_url),
            received
        );

        OutboundMessage {
            to: report.recipient.clone(),
            subject: format!("Location: {}", report.device_id),
            text,
            html,
        }
    }

    pub async fn dispatch(&self, report: &LocationReport) -> Result<DeliveryReceipt, SendError> {
        let message = self.compose(report, Utc::now());
        let start_time = Instant::now();

        let result = self.transport.send(&message).await;
        SEND_LATENCY.observe(start_time.elapsed().as_secs_f64());

        match &result {
            Ok(receipt) => {
                DELIVERIES.with_label_values(&["sent"]).inc();
                tracing::info!(
                    device_id = %report.device_id,
                    transport = receipt.transport,
                    id = ?receipt.id,
                    "Location notification sent"
                );
            }
            Err(SendError::NotConfigured(missing)) => {
                DELIVERIES.with_label_values(&["not_configured"]).inc();
                tracing::error!(
                    missing,
                    transport = self.transport.name(),
                    "Transport not configured"
                );
            }
            Err(SendError::Failed(detail)) => {
                DELIVERIES.with_label_values(&["failed"]).inc();
                tracing::warn!(
                    device_id = %report.device_id,
                    transport = self.transport.name(),
                    detail = %detail,
                    "Location notification failed"
                );
            }
        }
        result
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
