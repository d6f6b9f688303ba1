//! WebDAV adapter over a blocking HTTP client

use super::multistatus::{parse_multistatus, DavResource};
use super::RemoteStore;
use crate::types::{EntryKind, RemoteEntry, SyncError};
use percent_encoding::percent_decode_str;
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::trace;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?><d:propfind xmlns:d="DAV:"><d:prop><d:resourcetype/></d:prop></d:propfind>"#;

/// Connection settings for [`WebDavStore`]
#[derive(Debug, Clone)]
pub struct WebDavOptions {
    pub user: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    pub verify_certificate: bool,
}

impl Default for WebDavOptions {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            timeout: Duration::from_secs(10),
            verify_certificate: true,
        }
    }
}

pub struct WebDavStore {
    client: Client,
    base: Url,
    /// Decoded path of `base`, without trailing slash
    base_path: String,
    user: Option<String>,
    password: Option<String>,
    propfind: Method,
    mkcol: Method,
}

impl WebDavStore {
    pub fn new(base_url: &str, options: WebDavOptions) -> Result<Self, SyncError> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| SyncError::Config(format!("Invalid remote URL '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(SyncError::Config(format!(
                "Invalid remote URL '{base_url}': not a hierarchical URL"
            )));
        }
        let base_path = percent_decode_str(base.path())
            .decode_utf8_lossy()
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify_certificate)
            .build()
            .map_err(|e| SyncError::RemoteUnavailable(format!("Failed to build HTTP client: {e}")))?;

        let method = |name: &str| {
            Method::from_bytes(name.as_bytes())
                .map_err(|e| SyncError::Config(format!("Invalid HTTP method {name}: {e}")))
        };

        Ok(Self {
            client,
            base,
            base_path,
            user: options.user,
            password: options.password,
            propfind: method("PROPFIND")?,
            mkcol: method("MKCOL")?,
        })
    }

    fn url_for(&self, path: &str, collection: bool) -> Result<Url, SyncError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SyncError::Config(format!("Invalid remote URL '{}'", self.base)))?;
            segments.pop_if_empty();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
            if collection {
                segments.push("");
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.user {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    fn send(&self, builder: RequestBuilder, path: &str) -> Result<Response, SyncError> {
        builder
            .send()
            .map_err(|e| SyncError::RemoteUnavailable(format!("'{path}': {e}")))
    }

    fn propfind(&self, path: &str, depth: u8, collection: bool) -> Result<Vec<DavResource>, SyncError> {
        let url = self.url_for(path, collection)?;
        trace!(%url, depth, "PROPFIND");
        let builder = self
            .request(self.propfind.clone(), url)
            .header("Depth", depth.to_string())
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(PROPFIND_BODY);
        let response = check_status(self.send(builder, path)?, path)?;
        if response.status() != StatusCode::MULTI_STATUS {
            return Err(SyncError::RemoteStatus {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }
        let body = response
            .text()
            .map_err(|e| SyncError::RemoteUnavailable(format!("'{path}': {e}")))?;
        parse_multistatus(&body)
    }
}

/// Map authentication failures and 404 to their error classes
fn check_status(response: Response, path: &str) -> Result<Response, SyncError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SyncError::RemoteUnavailable(format!(
            "authentication failed for '{path}' ({status})"
        )));
    }
    if status == StatusCode::NOT_FOUND {
        return Err(SyncError::RemoteNotFound {
            path: path.to_string(),
        });
    }
    Ok(response)
}

fn expect_success(response: Response, path: &str) -> Result<Response, SyncError> {
    let response = check_status(response, path)?;
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(SyncError::RemoteStatus {
            status: response.status().as_u16(),
            path: path.to_string(),
        })
    }
}

/// Turn an `href` from a multistatus body into a name relative to the base.
///
/// Returns `None` for hrefs outside the base.
pub(crate) fn relative_name(base_path: &str, href: &str) -> Option<String> {
    let raw = if href.starts_with("http://") || href.starts_with("https://") {
        Url::parse(href).ok()?.path().to_string()
    } else {
        href.to_string()
    };
    let decoded = percent_decode_str(&raw).decode_utf8_lossy().into_owned();
    let decoded = decoded.trim_end_matches('/');
    let rest = decoded.strip_prefix(base_path)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    Some(rest.trim_matches('/').to_string())
}

impl RemoteStore for WebDavStore {
    fn describe(&self) -> String {
        self.base.to_string()
    }

    fn exists(&self, path: &str) -> Result<bool, SyncError> {
        match self.propfind(path, 0, false) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn is_directory(&self, path: &str) -> Result<bool, SyncError> {
        let resources = self.propfind(path, 0, false)?;
        resources
            .first()
            .map(|r| r.is_collection)
            .ok_or_else(|| SyncError::RemoteNotFound {
                path: path.to_string(),
            })
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, SyncError> {
        let listed = path.trim_matches('/');
        let mut entries = Vec::new();
        for resource in self.propfind(path, 1, true)? {
            let Some(name) = relative_name(&self.base_path, &resource.href) else {
                trace!(href = %resource.href, "ignoring href outside the remote base");
                continue;
            };
            if name == listed {
                continue;
            }
            let kind = if resource.is_collection {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(RemoteEntry::new(name, kind));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn make_directory(&self, path: &str) -> Result<(), SyncError> {
        let url = self.url_for(path, true)?;
        let response = check_status(self.send(self.request(self.mkcol.clone(), url), path)?, path)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::METHOD_NOT_ALLOWED {
            // Something already exists at this path
            return if self.is_directory(path)? {
                Ok(())
            } else {
                Err(SyncError::RemoteConflict {
                    path: path.to_string(),
                    reason: "a file already exists at this path".to_string(),
                })
            };
        }
        Err(SyncError::RemoteStatus {
            status: status.as_u16(),
            path: path.to_string(),
        })
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<(), SyncError> {
        let file = File::open(local)?;
        let url = self.url_for(remote, false)?;
        let builder = self.request(Method::PUT, url).body(Body::from(file));
        let response = check_status(self.send(builder, remote)?, remote)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::CONFLICT {
            Err(SyncError::RemoteConflict {
                path: remote.to_string(),
                reason: format!("server refused upload ({status})"),
            })
        } else {
            Err(SyncError::RemoteStatus {
                status: status.as_u16(),
                path: remote.to_string(),
            })
        }
    }

    fn download_into(&self, remote: &str, sink: &mut dyn Write) -> Result<(), SyncError> {
        let url = self.url_for(remote, false)?;
        let mut response = expect_success(self.send(self.request(Method::GET, url), remote)?, remote)?;
        response
            .copy_to(sink)
            .map_err(|e| SyncError::RemoteUnavailable(format!("'{remote}': {e}")))?;
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), SyncError> {
        // DELETE on a collection removes all members (RFC 4918 §9.6.1)
        let url = self.url_for(path, false)?;
        expect_success(self.send(self.request(Method::DELETE, url), path)?, path)?;
        Ok(())
    }
}
