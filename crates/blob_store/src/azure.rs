use std::sync::LazyLock;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::{BlobContentHeaders, BlobItem, BlobStore};

const API_VERSION: &str = "2021-08-06";

static BLOB_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Blob>(.*?)</Blob>").expect("valid regex"));

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Name>(.*?)</Name>").expect("valid regex"));

static LENGTH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Content-Length>\s*(\d+)\s*</Content-Length>").expect("valid regex"));

static MODIFIED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Last-Modified>(.*?)</Last-Modified>").expect("valid regex"));

static CHAR_REF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:x([0-9a-fA-F]+)|([0-9]+));").expect("valid regex"));

static NEXT_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<NextMarker>(.*?)</NextMarker>").expect("valid regex"));

/// Azure Blob Storage over its REST API, authenticated with a SAS token.
pub struct AzureBlobStore {
    http: Client,
    endpoint: Url,
    sas_token: Option<String>,
}

impl AzureBlobStore {
    /// `endpoint` is the account's blob service URL, e.g.
    /// `https://account.blob.core.windows.net`.
    pub fn new(endpoint: &str, sas_token: Option<&str>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("invalid blob endpoint '{endpoint}'"))?;
        if endpoint.cannot_be_a_base() {
            bail!("blob endpoint '{endpoint}' cannot be used as a base url");
        }
        let sas_token = sas_token
            .map(|token| token.trim().trim_start_matches('?').to_string())
            .filter(|token| !token.is_empty());
        Ok(Self {
            http: Client::new(),
            endpoint,
            sas_token,
        })
    }

    fn url(&self, container: &str, name: Option<&str>) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("blob endpoint cannot be a base url"))?;
            segments.pop_if_empty().push(container);
            if let Some(name) = name {
                segments.extend(name.split('/'));
            }
        }
        url.set_query(self.sas_token.as_deref());
        Ok(url)
    }

    async fn list_page(
        &self,
        container: &str,
        marker: Option<&str>,
    ) -> Result<Option<(Vec<BlobItem>, Option<String>)>> {
        let mut url = self.url(container, None)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("restype", "container");
            query.append_pair("comp", "list");
            if let Some(marker) = marker {
                query.append_pair("marker", marker);
            }
        }

        let response = self
            .http
            .get(url)
            .header("x-ms-version", API_VERSION)
            .send()
            .await
            .context("azure list blobs request failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = ensure_success(response, "list blobs")
            .await?
            .text()
            .await
            .context("failed to read azure list blobs response")?;
        Ok(Some(parse_list_blobs(&body)))
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn list(&self, container: &str) -> Result<Vec<BlobItem>> {
        let mut items = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let Some((page, next_marker)) =
                self.list_page(container, marker.as_deref()).await?
            else {
                debug!(%container, "container not found, listing as empty");
                return Ok(Vec::new());
            };
            items.extend(page);
            match next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(items)
    }

    async fn upload(
        &self,
        container: &str,
        name: &str,
        body: Vec<u8>,
        headers: BlobContentHeaders,
    ) -> Result<()> {
        let url = self.url(container, Some(name))?;
        let mut request = self
            .http
            .put(url)
            .header("x-ms-version", API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-blob-content-type", headers.content_type)
            .header(reqwest::header::CONTENT_TYPE, headers.content_type);
        if let Some(encoding) = headers.content_encoding {
            request = request.header("x-ms-blob-content-encoding", encoding);
        }

        let response = request
            .body(body)
            .send()
            .await
            .with_context(|| format!("azure put blob request failed for '{name}'"))?;
        ensure_success(response, "put blob").await?;
        Ok(())
    }

    async fn delete(&self, container: &str, name: &str) -> Result<bool> {
        let url = self.url(container, Some(name))?;
        let response = self
            .http
            .delete(url)
            .header("x-ms-version", API_VERSION)
            .send()
            .await
            .with_context(|| format!("azure delete blob request failed for '{name}'"))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response, "delete blob").await?;
        Ok(true)
    }
}

async fn ensure_success(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("azure {operation} failed with {status}: {body}")
}

/// Extracts the blobs and continuation marker of a List Blobs response.
pub(crate) fn parse_list_blobs(xml: &str) -> (Vec<BlobItem>, Option<String>) {
    let items = BLOB_REGEX
        .captures_iter(xml)
        .filter_map(|blob| {
            let body = blob.get(1)?.as_str();
            let name = unescape_xml(NAME_REGEX.captures(body)?.get(1)?.as_str());
            let size_bytes = LENGTH_REGEX
                .captures(body)
                .and_then(|c| c.get(1)?.as_str().parse().ok())
                .unwrap_or(0);
            let last_modified = MODIFIED_REGEX
                .captures(body)
                .and_then(|c| DateTime::parse_from_rfc2822(c.get(1)?.as_str().trim()).ok())
                .map(|value| value.with_timezone(&Utc));
            Some(BlobItem {
                name,
                size_bytes,
                last_modified,
            })
        })
        .collect();

    let next_marker = NEXT_MARKER_REGEX
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| unescape_xml(m.as_str().trim()))
        .filter(|marker| !marker.is_empty());

    (items, next_marker)
}

fn unescape_xml(value: &str) -> String {
    let value = CHAR_REF_REGEX.replace_all(value, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(decimal)) => decimal.as_str().parse().ok(),
            (None, None) => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
#[path = "tests/azure_tests.rs"]
mod tests;
