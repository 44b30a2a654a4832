//! HTTP(S) accessor
//!
//! Listing reads a JSON index document mapping bundle ids to versions to
//! archive URLs:
//!
//! ```json
//! { "ex/a": { "1": "https://bundles.example.org/ex-a/1/ex-a.tar.gz" } }
//! ```
//!
//! Relative URLs are resolved against the index URL. Uploads are a POST of
//! the archive to the upload URL.

use std::collections::BTreeMap;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use super::{Accessor, Deadline, listed_version};
use crate::cache::{Listing, ListingEntry};
use crate::domain::BundleKey;
use crate::error::{GraphpackError, Result, remote};

/// Content type of uploaded archives
pub const ARCHIVE_CONTENT_TYPE: &str = "application/x-gtar";

pub const BUNDLE_ID_HEADER: &str = "X-Bundle-Id";
pub const BUNDLE_VERSION_HEADER: &str = "X-Bundle-Version";

pub struct HttpAccessor {
    index_url: String,
    upload_url: Option<String>,
    client: Client,
}

impl HttpAccessor {
    pub fn new(index_url: String, upload_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("graphpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| remote::accessor_failed(&index_url, e))?;
        Ok(Self {
            index_url,
            upload_url,
            client,
        })
    }

    fn map_error(&self, e: reqwest::Error) -> GraphpackError {
        if e.is_timeout() {
            GraphpackError::AccessorTimeout {
                accessor: self.describe(),
            }
        } else {
            remote::accessor_failed(self.describe(), e)
        }
    }

    fn get(&self, url: &str, deadline: &Deadline) -> Result<Vec<u8>> {
        deadline.check(&self.describe())?;
        let response = self
            .client
            .get(url)
            .timeout(deadline.remaining())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.map_error(e))?;
        let bytes = response.bytes().map_err(|e| self.map_error(e))?;
        Ok(bytes.to_vec())
    }

    /// Parse an index document into a listing
    pub fn parse_index(&self, body: &[u8]) -> Result<Listing> {
        let index: BTreeMap<String, BTreeMap<String, serde_json::Value>> =
            serde_json::from_slice(body)
                .map_err(|e| remote::accessor_failed(self.describe(), format!("invalid index: {e}")))?;
        let base = Url::parse(&self.index_url).map_err(|e| remote::accessor_failed(self.describe(), e))?;

        let mut entries = Vec::new();
        for (id, versions) in index {
            for (version, url) in versions {
                let Some(version) = listed_version(&self.index_url, &id, &version) else {
                    continue;
                };
                let Some(url) = url.as_str() else {
                    warn!(id = %id, version, "skipping non-string archive URL in bundle index");
                    continue;
                };
                let Ok(url) = base.join(url) else {
                    warn!(id = %id, version, url, "skipping invalid archive URL in bundle index");
                    continue;
                };
                entries.push(ListingEntry {
                    id: id.clone(),
                    version,
                    locator: url.to_string(),
                });
            }
        }
        Ok(Listing::new(entries))
    }
}

impl Accessor for HttpAccessor {
    fn describe(&self) -> String {
        self.index_url.clone()
    }

    fn list(&self, deadline: &Deadline) -> Result<Listing> {
        let body = self.get(&self.index_url, deadline)?;
        self.parse_index(&body)
    }

    fn fetch(&self, entry: &ListingEntry, deadline: &Deadline) -> Result<Vec<u8>> {
        let url = if entry.locator.starts_with("http://") || entry.locator.starts_with("https://") {
            entry.locator.clone()
        } else {
            // The entry was listed by another accessor of the same remote
            let listing = self.list(deadline)?;
            listing
                .locate(&entry.id, entry.version)
                .map(|e| e.locator.clone())
                .ok_or_else(|| {
                    remote::accessor_failed(
                        self.describe(),
                        format!("{}@{} is not in the index", entry.id, entry.version),
                    )
                })?
        };
        debug!(url = %url, "downloading archive");
        self.get(&url, deadline)
    }

    fn can_upload(&self) -> bool {
        self.upload_url.is_some()
    }

    fn upload(&self, archive: &[u8], key: &BundleKey, deadline: &Deadline) -> Result<()> {
        let Some(upload_url) = &self.upload_url else {
            return Err(GraphpackError::UploadNotSupported {
                accessor: self.describe(),
            });
        };
        deadline.check(&self.describe())?;
        self.client
            .post(upload_url)
            .timeout(deadline.remaining())
            .header(CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
            .header(BUNDLE_ID_HEADER, key.id.as_str())
            .header(BUNDLE_VERSION_HEADER, key.version.to_string())
            .body(archive.to_vec())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.map_error(e))?;
        debug!(key = %key, url = %upload_url, "uploaded archive");
        Ok(())
    }
}
