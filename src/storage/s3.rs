use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response, StatusCode, Url};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::ObjectStore;
use crate::{config::Config, error::StoreError};

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SERVICE: &str = "s3";

/// Path-style S3 client (MinIO-compatible) signing with AWS Signature V4.
#[derive(Debug, Clone)]
pub struct S3Client {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    base_url: Url,
    /// `Host` header value exactly as reqwest will send it.
    host: String,
    region: String,
    access_key: String,
    secret_key: String,
}

impl S3Client {
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        Self::with_endpoint(
            &config.minio_base_url(),
            &config.minio_region,
            &config.minio_access_key,
            &config.minio_secret_key,
        )
    }

    pub fn with_endpoint(
        base_url: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, StoreError> {
        let base_url =
            Url::parse(base_url).map_err(|e| StoreError(format!("invalid MINIO_ENDPOINT: {e}")))?;
        let host = host_header(&base_url)?;
        Ok(Self {
            inner: Arc::new(Inner {
                http: Client::new(),
                base_url,
                host,
                region: region.to_owned(),
                access_key: access_key.to_owned(),
                secret_key: secret_key.to_owned(),
            }),
        })
    }

    async fn send(&self, method: Method, canonical_uri: &str, body: Vec<u8>) -> Result<Response, StoreError> {
        let url = self
            .inner
            .base_url
            .join(canonical_uri)
            .map_err(|e| StoreError(format!("invalid object URL {canonical_uri}: {e}")))?;
        debug!(method = %method, url = %url, "Object store request");

        let amz_date = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let ctx = SigningContext {
            method: method.as_str(),
            canonical_uri,
            host: &self.inner.host,
            body_bytes: &body,
            amz_date: &amz_date,
        };
        let headers = build_signed_headers(
            &self.inner.access_key,
            &self.inner.secret_key,
            &self.inner.region,
            &ctx,
        );

        let resp = self
            .inner
            .http
            .request(method, url)
            .headers(to_header_map(headers)?)
            .body(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        Ok(resp)
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let uri = format!("/{}", uri_encode(bucket));

        let head = self.send(Method::HEAD, &uri, Vec::new()).await?;
        match head.status() {
            s if s.is_success() => {
                debug!(bucket = %bucket, "Bucket exists");
                return Ok(());
            }
            StatusCode::NOT_FOUND => {}
            s => return Err(StoreError(format!("bucket check for {bucket} returned {s}"))),
        }

        info!(bucket = %bucket, "Creating bucket");
        self.send(Method::PUT, &uri, Vec::new())
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, name: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let uri = format!("/{}/{}", uri_encode(bucket), uri_encode(name));
        self.send(Method::PUT, &uri, body).await?.error_for_status()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Signing helpers
// ---------------------------------------------------------------------------

/// Deterministic signing inputs used by tests.
#[derive(Debug)]
pub(crate) struct SigningContext<'a> {
    pub method: &'a str,
    /// Already percent-encoded path, e.g. `/bucket/temperature_2024-05-01T10%3A00.json`.
    pub canonical_uri: &'a str,
    pub host: &'a str,
    pub body_bytes: &'a [u8],
    /// `YYYYMMDDTHHMMSSZ`
    pub amz_date: &'a str,
}

/// Build the SigV4 headers for a request without a query string.
///
/// Signed headers are `host`, `x-amz-content-sha256` and `x-amz-date`.
/// Reference: <https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_sigv-create-signed-request.html>
pub(crate) fn build_signed_headers(
    access_key: &str,
    secret_key: &str,
    region: &str,
    ctx: &SigningContext<'_>,
) -> HashMap<String, String> {
    let SigningContext { method, canonical_uri, host, body_bytes, amz_date } = ctx;
    let date = &amz_date[..8];

    // 1. Payload hash.
    let payload_hash = hex::encode(Sha256::digest(body_bytes));

    // 2. Canonical request. Headers are lowercase and sorted; the header block
    //    ends with its own newline.
    let signed_headers = "host;x-amz-content-sha256;x-amz-date";
    let canonical_request = format!(
        "{method}\n{canonical_uri}\n\n\
         host:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n\n\
         {signed_headers}\n{payload_hash}"
    );

    // 3. String to sign.
    let scope = format!("{date}/{region}/{SERVICE}/aws4_request");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    // 4. Signature.
    let key = signing_key(secret_key, date, region, SERVICE);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    // 5. Assemble headers. `host` is set by reqwest from the URL.
    let mut headers = HashMap::new();
    headers.insert("x-amz-date".to_owned(), amz_date.to_string());
    headers.insert("x-amz-content-sha256".to_owned(), payload_hash);
    headers.insert(
        "authorization".to_owned(),
        format!(
            "AWS4-HMAC-SHA256 Credential={access_key}/{scope}, \
             SignedHeaders={signed_headers}, Signature={signature}"
        ),
    );
    headers
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

pub(crate) fn signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Percent-encode one path segment the way SigV4 expects: everything but
/// `A-Z a-z 0-9 - _ . ~` is escaped with uppercase hex.
pub(crate) fn uri_encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn host_header(url: &Url) -> Result<String, StoreError> {
    let host = url
        .host_str()
        .ok_or_else(|| StoreError(format!("object store URL has no host: {url}")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

/// Convert our string `HashMap` into a `reqwest::header::HeaderMap`.
fn to_header_map(map: HashMap<String, String>) -> Result<reqwest::header::HeaderMap, StoreError> {
    let mut header_map = reqwest::header::HeaderMap::new();
    for (k, v) in map {
        let name = reqwest::header::HeaderName::from_bytes(k.as_bytes())
            .map_err(|_| StoreError(format!("invalid header name: {k}")))?;
        let value = reqwest::header::HeaderValue::from_str(&v)
            .map_err(|_| StoreError(format!("invalid header value for {k}")))?;
        header_map.insert(name, value);
    }
    Ok(header_map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
