//! HubSpot connector.
//!
//! Pulls the full contact set from HubSpot CRM API v3 (`GET /crm/v3/objects/contacts`),
//! following `paging.next.after` until the last page.

use async_trait::async_trait;
use contactsync_core::sync::models::lenient_string;
use contactsync_core::{ContactSource, Error, ExternalContactRecord, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

const PROPERTIES: &[&str] = &[
    "firstname",
    "lastname",
    "email",
    "phone",
    "company",
    "jobtitle",
    "lastmodifieddate",
];

#[derive(Debug, Deserialize)]
struct HubspotListResponse {
    /// Decoded per object so one odd object cannot fail the page.
    #[serde(default)]
    results: Vec<serde_json::Value>,
    #[serde(default)]
    paging: Option<HubspotPaging>,
}

#[derive(Debug, Deserialize)]
struct HubspotPaging {
    #[serde(default)]
    next: Option<HubspotNextPage>,
}

#[derive(Debug, Deserialize)]
struct HubspotNextPage {
    after: String,
}

#[derive(Debug, Default, Deserialize, Clone)]
struct HubspotObject {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default)]
    properties: serde_json::Value,
    #[serde(rename = "createdAt", default, deserialize_with = "lenient_string")]
    created_at: Option<String>,
    #[serde(rename = "updatedAt", default, deserialize_with = "lenient_string")]
    updated_at: Option<String>,
    #[serde(default)]
    archived: serde_json::Value,
}

impl HubspotObject {
    fn from_json(value: &serde_json::Value) -> Self {
        Self::deserialize(value).unwrap_or_default()
    }

    fn prop(&self, key: &str) -> Option<String> {
        self.properties
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn into_record(self) -> ExternalContactRecord {
        let name = match (self.prop("firstname"), self.prop("lastname")) {
            (Some(f), Some(l)) => Some(format!("{f} {l}")),
            (Some(f), None) => Some(f),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        };
        let metadata = serde_json::json!({
            "source": "hubspot",
            "created_at": self.created_at,
            "updated_at": self.updated_at,
            "archived": self.archived.as_bool(),
            "lastmodifieddate": self.prop("lastmodifieddate"),
        });
        ExternalContactRecord {
            external_id: self.id.clone(),
            name,
            email: self.prop("email"),
            phone: self.prop("phone"),
            company: self.prop("company"),
            role: self.prop("jobtitle"),
            metadata,
        }
    }
}

#[derive(Clone)]
pub struct HubSpotConnector {
    client: Client,
    api_base: String,
    token: String,
    page_size: u32,
    max_pages: u32,
}

impl HubSpotConnector {
    /// Build a connector authenticated with a private-app access token.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::InvalidInput("hubspot access token is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| Error::source_unavailable("build hubspot http client", e))?;
        Ok(Self {
            client,
            api_base: "https://api.hubapi.com".to_string(),
            token,
            page_size: 100,
            max_pages: 1_000,
        })
    }

    /// Configure from `HUBSPOT_ACCESS_TOKEN`, `HUBSPOT_API_BASE`, `HUBSPOT_PAGE_SIZE` and
    /// `HUBSPOT_MAX_PAGES`.
    #[instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("HUBSPOT_ACCESS_TOKEN")
            .map_err(|_| Error::InvalidInput("HUBSPOT_ACCESS_TOKEN is required".to_string()))?;
        let mut connector = Self::new(token)?;
        if let Ok(base) = std::env::var("HUBSPOT_API_BASE") {
            if !base.trim().is_empty() {
                connector = connector.with_api_base(base);
            }
        }
        if let Some(n) = env_u32("HUBSPOT_PAGE_SIZE")? {
            connector = connector.with_page_size(n);
        }
        if let Some(n) = env_u32("HUBSPOT_MAX_PAGES")? {
            connector = connector.with_max_pages(n);
        }
        Ok(connector)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// HubSpot caps list pages at 100.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 100);
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    async fn fetch_page(&self, after: Option<&str>) -> Result<HubspotListResponse> {
        let url = format!("{}/crm/v3/objects/contacts", self.api_base);
        let mut query: Vec<(&str, String)> = vec![
            ("limit", self.page_size.to_string()),
            ("properties", PROPERTIES.join(",")),
            ("archived", "false".to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::source_unavailable("hubspot request", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::source_unavailable("read hubspot response", e))?;
        serde_json::from_slice::<HubspotListResponse>(&bytes)
            .map_err(|e| Error::SourceProtocol(format!("decode hubspot contacts page: {e}")))
    }
}

fn classify_status(status: StatusCode, body: &str) -> Error {
    let snippet: String = body.chars().take(200).collect();
    let msg = format!("hubspot returned {status}: {snippet}");
    match status {
        StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => Error::source_unavailable_msg(msg),
        s if s.is_server_error() => Error::source_unavailable_msg(msg),
        _ => Error::SourceProtocol(msg),
    }
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|e| Error::InvalidInput(format!("invalid {key}: {e}"))),
        _ => Ok(None),
    }
}

#[async_trait]
impl ContactSource for HubSpotConnector {
    fn id(&self) -> &'static str {
        "hubspot"
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch_all(&self) -> Result<Vec<ExternalContactRecord>> {
        let mut out = Vec::new();
        let mut after: Option<String> = None;
        let mut pages = 0u32;

        loop {
            if pages >= self.max_pages {
                return Err(Error::SourceProtocol(format!(
                    "hubspot pagination exceeded {} pages",
                    self.max_pages
                )));
            }
            let page = self.fetch_page(after.as_deref()).await?;
            pages += 1;
            out.extend(
                page.results
                    .iter()
                    .map(|v| HubspotObject::from_json(v).into_record()),
            );

            let next = page.paging.and_then(|p| p.next).map(|n| n.after);
            match next {
                None => break,
                Some(n) if after.as_deref() == Some(n.as_str()) => {
                    return Err(Error::SourceProtocol(format!(
                        "hubspot repeated pagination cursor '{n}'"
                    )));
                }
                Some(n) => after = Some(n),
            }
        }

        tracing::debug!(pages, contacts = out.len(), "hubspot contacts fetched");
        Ok(out)
    }
}
