use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use tracing::{debug, info};

use crate::attachment::Attachment;
use crate::message::{ImageData, Message};

/// One submission: the composer text plus the raw files staged with it.
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    pub text: String,
    pub files: Vec<Attachment>,
}

/// JSON body returned by `POST /ask`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskResponse {
    pub response: String,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub special_user: Option<String>,
}

impl AskResponse {
    pub fn image(&self) -> Option<ImageData> {
        ImageData::from_parts(
            self.image_base64.clone(),
            self.image_url.clone(),
            self.image_type.clone(),
            self.special_user.clone(),
        )
    }

    /// Assistant message that starts its typewriter reveal.
    pub fn into_message(self) -> Message {
        let image = self.image();
        Message::revealing(self.response, image)
    }
}

#[derive(Clone)]
pub struct AskClient {
    client: Client,
    base_url: String,
}

impl AskClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/ask", self.base_url)
    }

    /// Multipart form with a `message` field and one `files` part per attachment.
    pub fn build_request(&self, outbound: &OutboundMessage) -> Result<RequestBuilder> {
        let mut form = Form::new().text("message", outbound.text.clone());
        for file in &outbound.files {
            let part = Part::bytes(file.data.to_vec())
                .file_name(file.name.clone())
                .mime_str(&file.mime_type)
                .map_err(|e| anyhow!("Invalid media type {:?} for {}: {}", file.mime_type, file.name, e))?;
            form = form.part("files", part);
        }

        Ok(self.client.post(self.endpoint()).multipart(form))
    }

    pub async fn ask(&self, outbound: &OutboundMessage) -> Result<AskResponse> {
        info!(
            endpoint = %self.endpoint(),
            chars = outbound.text.chars().count(),
            files = outbound.files.len(),
            "sending message"
        );

        let response = self.build_request(outbound)?.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Backend error {}: {}", status, text));
        }

        let ask_response: AskResponse = response.json().await?;
        debug!(
            chars = ask_response.response.chars().count(),
            has_image = ask_response.image_base64.is_some() || ask_response.image_url.is_some(),
            "received response"
        );
        Ok(ask_response)
    }
}
