//! Parsing of WebDAV `207 Multi-Status` PROPFIND responses
//!
//! Namespace prefixes differ between servers (`D:`, `d:`, `lp1:`, none), so
//! elements are matched by local name only.

use crate::types::SyncError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// One `<response>` element of a multistatus body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResource {
    /// Raw `href` as sent by the server (percent-encoded)
    pub href: String,
    pub is_collection: bool,
}

pub fn parse_multistatus(body: &str) -> Result<Vec<DavResource>, SyncError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut resources = Vec::new();
    let mut current: Option<DavResource> = None;
    let mut in_href = false;
    let mut in_resourcetype = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"response" => {
                    current = Some(DavResource {
                        href: String::new(),
                        is_collection: false,
                    })
                }
                b"href" => in_href = true,
                b"resourcetype" => in_resourcetype = true,
                b"collection" if in_resourcetype => {
                    if let Some(resource) = current.as_mut() {
                        resource.is_collection = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"collection" && in_resourcetype {
                    if let Some(resource) = current.as_mut() {
                        resource.is_collection = true;
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if in_href {
                    let text = t
                        .unescape()
                        .map_err(|e| SyncError::RemoteUnavailable(format!("invalid PROPFIND XML: {e}")))?;
                    if let Some(resource) = current.as_mut() {
                        resource.href.push_str(&text);
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"response" => {
                    if let Some(resource) = current.take() {
                        if !resource.href.is_empty() {
                            resources.push(resource);
                        }
                    }
                }
                b"href" => in_href = false,
                b"resourcetype" => in_resourcetype = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SyncError::RemoteUnavailable(format!(
                    "invalid PROPFIND XML at position {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    Ok(resources)
}
