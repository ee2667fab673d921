//! Best-effort email dispatch through the configured relay endpoint.
//! A failed send is logged and dropped; it never fails the request that
//! triggered it.

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Mailer {
    client: Client,
    relay_url: Option<String>,
}

impl Mailer {
    pub fn new(relay_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            relay_url,
        }
    }

    /// Hands the message to the relay on a spawned task. The caller's
    /// response never waits on delivery.
    pub fn send(&self, email: String, subject: String, message: String) {
        let Some(url) = self.relay_url.clone() else {
            debug!("mail relay not configured, dropping message to {email}");
            return;
        };

        let client = self.client.clone();

        tokio::spawn(async move {
            let payload = json!({
                "email": email,
                "subject": subject,
                "message": message,
            });

            match client.post(&url).json(&payload).send().await {
                Ok(response) if !response.status().is_success() => {
                    warn!(
                        "mail relay rejected message to {email}: {}",
                        response.status()
                    );
                }
                Ok(_) => {}
                Err(e) => warn!("failed to send email to {email}: {e}"),
            }
        });
    }
}
