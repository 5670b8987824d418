use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client, Method, StatusCode};
use std::time::Duration;
use url::Url;

use super::sigv4::{self, Credentials, EMPTY_PAYLOAD_SHA256};
use super::{ObjectStore, StorageError};
use crate::config::SpacesConfig;

static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<Key>([^<]*)</Key>").expect("valid regex"));
static TRUNCATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<IsTruncated>\s*true\s*</IsTruncated>").expect("valid regex"));
static CONTINUATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<NextContinuationToken>([^<]*)</NextContinuationToken>").expect("valid regex")
});

/// Stop paginating after this many pages of 1000 keys.
const MAX_LIST_PAGES: usize = 50;

/// DigitalOcean Spaces (or any S3-compatible endpoint) using path-style addressing.
pub struct SpacesStore {
    client: Client,
    endpoint: Url,
    bucket: String,
    credentials: Credentials,
}

impl SpacesStore {
    pub fn from_config(config: &SpacesConfig) -> Result<Self, StorageError> {
        let (Some(key), Some(secret)) = (&config.key, &config.secret) else {
            return Err(StorageError::Config("DO_SPACES_KEY and DO_SPACES_SECRET are required".into()));
        };

        let endpoint = Url::parse(&config.endpoint_url())
            .map_err(|e| StorageError::Config(format!("invalid endpoint: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            bucket: config.bucket.clone(),
            credentials: Credentials {
                access_key: key.clone(),
                secret_key: secret.clone(),
                region: config.region.clone(),
            },
        })
    }

    fn object_url(&self, key: &str, query: Option<&str>) -> Result<Url, StorageError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        let mut raw = format!(
            "{}/{}/{}",
            base,
            sigv4::uri_encode(&self.bucket, false),
            sigv4::uri_encode(key, true)
        );
        if let Some(query) = query {
            raw.push('?');
            raw.push_str(query);
        }
        Url::parse(&raw).map_err(|e| StorageError::Config(format!("invalid object url: {}", e)))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<reqwest::Response, StorageError> {
        let payload_hash = if body.is_empty() {
            EMPTY_PAYLOAD_SHA256.to_string()
        } else {
            sigv4::sha256_hex(&body)
        };
        let signed = sigv4::sign(&self.credentials, method.as_str(), &url, &[], &payload_hash, Utc::now());

        let mut request = self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, signed.authorization)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256);
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }

    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ListPage, StorageError> {
        let mut query = vec![
            "list-type=2".to_string(),
            format!("prefix={}", sigv4::uri_encode(prefix, false)),
        ];
        if let Some(token) = continuation {
            query.push(format!("continuation-token={}", sigv4::uri_encode(token, false)));
        }
        let url = self.object_url("", Some(&query.join("&")))?;

        let response = self.send(Method::GET, url, Vec::new(), None).await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(parse_list_response(&body))
    }
}

#[derive(Debug, Default, PartialEq)]
struct ListPage {
    keys: Vec<String>,
    next: Option<String>,
}

fn parse_list_response(xml: &str) -> ListPage {
    let keys = KEY_RE
        .captures_iter(xml)
        .map(|c| unescape_xml(&c[1]))
        .collect();
    let next = if TRUNCATED_RE.is_match(xml) {
        CONTINUATION_RE.captures(xml).map(|c| unescape_xml(&c[1]))
    } else {
        None
    };
    ListPage { keys, next }
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[async_trait]
impl ObjectStore for SpacesStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.object_url(key, None)?;
        let response = self.send(Method::GET, url, Vec::new(), None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            status => Err(StorageError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let url = self.object_url(key, None)?;
        let response = self.send(Method::PUT, url, body, Some(content_type)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        tracing::debug!("Stored object {}", key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let page = self.list_page(prefix, continuation.as_deref()).await?;
            keys.extend(page.keys);
            match page.next {
                Some(next) => continuation = Some(next),
                None => return Ok(keys),
            }
        }

        tracing::warn!("Listing {} stopped after {} pages", prefix, MAX_LIST_PAGES);
        Ok(keys)
    }

    fn describe(&self) -> String {
        format!("spaces bucket '{}' at {}", self.bucket, self.endpoint)
    }
}
