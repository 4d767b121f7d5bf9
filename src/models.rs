use serde::{Deserialize, Serialize};

// Message handed to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

// What a transport reports after a successful send
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    pub transport: &'static str,
    pub id: Option<String>,
}

// Resend API request format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ResendEmailRequest {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

// Resend API response format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ResendEmailResponse {
    #[serde(default)]
    pub id: Option<String>,
}
