//! S3-compatible storage (AWS S3, MinIO) over presigned URLs.
//!
//! Every request, including the ones Docvault sends itself (bucket checks,
//! deletes), uses an AWS Signature V4 query-presigned URL with
//! `UNSIGNED-PAYLOAD`, so no request body is ever hashed.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use super::{ObjectStorage, StorageConfig, StorageError};

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of URLs used for Docvault's own requests.
const INTERNAL_URL_TTL_SECS: i64 = 60;

/// Inputs to a Signature V4 query presign.
pub(crate) struct SigningInput<'a> {
    pub method: &'a str,
    pub host: &'a str,
    /// Already URI-encoded path.
    pub canonical_uri: &'a str,
    pub region: &'a str,
    /// Signed as the `content-type` header when present.
    pub content_type: Option<&'a str>,
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub expires_secs: i64,
    pub now: DateTime<Utc>,
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>, StorageError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StorageError::Config(format!("hmac key: {e}")))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// RFC 3986 percent-encoding as S3 expects it (unreserved set only).
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Build the presigned query string (including `X-Amz-Signature`).
pub(crate) fn presign_query(input: &SigningInput<'_>) -> Result<String, StorageError> {
    let amz_date = input.now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = input.now.format("%Y%m%d").to_string();
    let scope = format!("{date}/{}/s3/aws4_request", input.region);
    let (canonical_headers, signed_headers) = match input.content_type {
        Some(ct) => (
            format!("content-type:{}\nhost:{}\n", ct.trim(), input.host),
            "content-type;host",
        ),
        None => (format!("host:{}\n", input.host), "host"),
    };

    // Sorted by parameter name.
    let params = [
        ("X-Amz-Algorithm", "AWS4-HMAC-SHA256".to_string()),
        ("X-Amz-Credential", format!("{}/{scope}", input.access_key)),
        ("X-Amz-Date", amz_date.clone()),
        ("X-Amz-Expires", input.expires_secs.to_string()),
        ("X-Amz-SignedHeaders", signed_headers.to_string()),
    ];
    let canonical_query = params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = format!(
        "{}\n{}\n{}\n{canonical_headers}\n{signed_headers}\nUNSIGNED-PAYLOAD",
        input.method, input.canonical_uri, canonical_query
    );
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{:x}",
        Sha256::digest(canonical_request.as_bytes())
    );

    let k_date = hmac_sha256(format!("AWS4{}", input.secret_key).as_bytes(), &date)?;
    let k_region = hmac_sha256(&k_date, input.region)?;
    let k_service = hmac_sha256(&k_region, "s3")?;
    let k_signing = hmac_sha256(&k_service, "aws4_request")?;
    let signature = hmac_sha256(&k_signing, &string_to_sign)?
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>();

    Ok(format!("{canonical_query}&X-Amz-Signature={signature}"))
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|s| s.is_empty() || s == "..") {
        return Err(StorageError::InvalidKey);
    }
    Ok(())
}

/// Path-style S3 client that signs URLs locally.
pub struct S3Storage {
    config: StorageConfig,
    scheme: String,
    host: String,
    client: reqwest::Client,
    bucket_ready: OnceCell<()>,
}

impl S3Storage {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| StorageError::Config(format!("invalid endpoint: {e}")))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => return Err(StorageError::Config("endpoint has no host".into())),
        };
        if config.bucket.is_empty() {
            return Err(StorageError::Config("bucket name is empty".into()));
        }
        Ok(Self {
            scheme: endpoint.scheme().to_string(),
            host,
            config,
            client: reqwest::Client::new(),
            bucket_ready: OnceCell::new(),
        })
    }

    /// Presign `method` on the bucket (`key = None`) or an object.
    fn presign(
        &self,
        method: &str,
        key: Option<&str>,
        content_type: Option<&str>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let mut path = format!("/{}", uri_encode(&self.config.bucket, true));
        if let Some(key) = key {
            validate_key(key)?;
            path.push('/');
            path.push_str(&uri_encode(key, false));
        }
        let query = presign_query(&SigningInput {
            method,
            host: &self.host,
            canonical_uri: &path,
            region: &self.config.region,
            content_type,
            access_key: &self.config.access_key,
            secret_key: &self.config.secret_key,
            expires_secs: ttl.num_seconds(),
            now,
        })?;
        Ok(format!("{}://{}{}?{}", self.scheme, self.host, path, query))
    }

    fn internal_url(&self, method: &str, key: Option<&str>) -> Result<String, StorageError> {
        self.presign(
            method,
            key,
            None,
            Duration::seconds(INTERNAL_URL_TTL_SECS),
            Utc::now(),
        )
    }

    /// Make sure the bucket exists.
    ///
    /// Concurrent first callers share one check. A failed check is not
    /// remembered, so the next caller retries.
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        self.bucket_ready
            .get_or_try_init(|| async {
                let head = self.client.head(self.internal_url("HEAD", None)?).send().await?;
                match head.status().as_u16() {
                    200..=299 => Ok(()),
                    404 => {
                        let created = self.client.put(self.internal_url("PUT", None)?).send().await?;
                        match created.status().as_u16() {
                            // 409: created concurrently by someone else.
                            200..=299 | 409 => {
                                info!(bucket = %self.config.bucket, "created storage bucket");
                                Ok(())
                            }
                            status => Err(StorageError::Status {
                                operation: "create bucket",
                                status,
                            }),
                        }
                    }
                    status => Err(StorageError::Status {
                        operation: "head bucket",
                        status,
                    }),
                }
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn issue_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.ensure_bucket().await?;
        self.presign(
            "PUT",
            Some(key),
            Some(content_type),
            self.config.upload_url_ttl,
            Utc::now(),
        )
    }

    async fn issue_download_url(&self, key: &str) -> Result<String, StorageError> {
        self.ensure_bucket().await?;
        self.presign("GET", Some(key), None, self.config.download_url_ttl, Utc::now())
    }

    async fn delete_blob(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_bucket().await?;
        let resp = self.client.delete(self.internal_url("DELETE", Some(key))?).send().await?;
        match resp.status().as_u16() {
            200..=299 | 404 => {
                debug!(key, "deleted blob");
                Ok(())
            }
            status => Err(StorageError::Status {
                operation: "delete object",
                status,
            }),
        }
    }
}
