// Optional prompt translation through an HTTP translation service

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const FAILED_MARKER: &str = "[Translation failed]";
const MAX_IN_FLIGHT: usize = 4;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("translator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected translator response: {0}")]
    Response(String),

    #[error("invalid translator URL: {0}")]
    Url(#[from] url::ParseError),
}

#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError>;
}

/// Which external service backs the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorEngine {
    LibreTranslate,
    MyMemory,
}

impl TranslatorEngine {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "libretranslate" | "libre" => Some(TranslatorEngine::LibreTranslate),
            "mymemory" => Some(TranslatorEngine::MyMemory),
            _ => None,
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            TranslatorEngine::LibreTranslate => "http://localhost:5000/",
            TranslatorEngine::MyMemory => "https://api.mymemory.translated.net/",
        }
    }

    pub fn build(
        &self,
        base_url: Option<Url>,
        api_key: Option<String>,
    ) -> Result<Arc<dyn Translator>, TranslateError> {
        let base_url = match base_url {
            Some(url) => url,
            None => Url::parse(self.default_url())?,
        };
        let translator: Arc<dyn Translator> = match self {
            TranslatorEngine::LibreTranslate => Arc::new(LibreTranslate::new(base_url, api_key)?),
            TranslatorEngine::MyMemory => Arc::new(MyMemory::new(base_url)?),
        };
        Ok(translator)
    }
}

/// A `from:to` language pair such as `en:zh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationDirection {
    pub from: String,
    pub to: String,
}

impl TranslationDirection {
    pub fn parse(s: &str) -> Result<Self, String> {
        let (from, to) = s
            .split_once(':')
            .or_else(|| s.split_once("->"))
            .ok_or_else(|| format!("Invalid translation direction '{}', expected e.g. en:zh", s))?;

        let from = from.trim().to_lowercase();
        let to = to.trim().to_lowercase();
        if from.is_empty() || to.is_empty() {
            return Err(format!("Invalid translation direction '{}', expected e.g. en:zh", s));
        }
        if from == to {
            return Err(format!("Source and target language are both '{}'", from));
        }

        Ok(Self { from, to })
    }

    /// Display label, e.g. `EN→ZH`.
    pub fn label(&self) -> String {
        format!("{}→{}", self.from.to_uppercase(), self.to.to_uppercase())
    }
}

/// Optional collaborators handed to a run. Without a translator prompts are
/// shown as extracted.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub translator: Option<Arc<dyn Translator>>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_translator(translator: Arc<dyn Translator>) -> Self {
        Self {
            translator: Some(translator),
        }
    }

    pub fn can_translate(&self) -> bool {
        self.translator.is_some()
    }
}

/// Translates every text, keeping order and length. Items that fail are
/// returned as `[Translation failed] <original>`.
pub async fn translate_all(
    translator: &dyn Translator,
    texts: &[String],
    direction: &TranslationDirection,
) -> Vec<String> {
    stream::iter(texts.iter().enumerate())
        .map(|(i, text)| async move {
            if text.trim().is_empty() {
                return text.clone();
            }
            match translator.translate(text, &direction.from, &direction.to).await {
                Ok(translated) => {
                    debug!("{} translated prompt {} ({})", translator.name(), i + 1, direction.label());
                    translated
                }
                Err(e) => {
                    warn!("{} failed on prompt {}: {}", translator.name(), i + 1, e);
                    format!("{} {}", FAILED_MARKER, text)
                }
            }
        })
        .buffered(MAX_IN_FLIGHT)
        .collect()
        .await
}

fn http_client() -> Result<Client, TranslateError> {
    Ok(Client::builder()
        .user_agent(concat!("promptlift/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()?)
}

fn endpoint(base: &Url, path: &str) -> Result<Url, TranslateError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path)?)
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, TranslateError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TranslateError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Client for a LibreTranslate server (`POST /translate`).
pub struct LibreTranslate {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct LibreTranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl LibreTranslate {
    pub fn new(base_url: Url, api_key: Option<String>) -> Result<Self, TranslateError> {
        Ok(Self {
            client: http_client()?,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl Translator for LibreTranslate {
    fn name(&self) -> &'static str {
        "LibreTranslate"
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError> {
        let mut body = serde_json::json!({
            "q": text,
            "source": from,
            "target": to,
            "format": "text",
        });
        if let Some(ref key) = self.api_key {
            body["api_key"] = Value::String(key.clone());
        }

        let response = self
            .client
            .post(endpoint(&self.base_url, "translate")?)
            .json(&body)
            .send()
            .await?;
        let parsed: LibreTranslateResponse = error_for_status(response).await?.json().await?;
        Ok(parsed.translated_text)
    }
}

/// Client for the MyMemory public API (`GET /get?q=..&langpair=from|to`).
pub struct MyMemory {
    client: Client,
    base_url: Url,
}

impl MyMemory {
    pub fn new(base_url: Url) -> Result<Self, TranslateError> {
        Ok(Self {
            client: http_client()?,
            base_url,
        })
    }
}

#[async_trait]
impl Translator for MyMemory {
    fn name(&self) -> &'static str {
        "MyMemory"
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError> {
        let langpair = format!("{}|{}", from, to);
        let response = self
            .client
            .get(endpoint(&self.base_url, "get")?)
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await?;
        let body: Value = error_for_status(response).await?.json().await?;

        // responseStatus arrives as a number or a numeric string
        let status = match &body["responseStatus"] {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        if status != Some(200) {
            let detail = body["responseDetails"].as_str().unwrap_or("no details");
            return Err(TranslateError::Response(format!(
                "status {:?}: {}",
                status, detail
            )));
        }

        body["responseData"]["translatedText"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TranslateError::Response("missing responseData.translatedText".to_string()))
    }
}
