//! Sink that fetches content for additions and prints every event.

use super::OutputFormat;
use crawlfeed_core::{ContentStore, DocumentContent, DocumentEvent};
use crawlfeed_engine::{DocumentSink, DriverError, DriverResult};
use crawlfeed_checkpoint::format_timestamp;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Serialize)]
struct ContentSummary<'a> {
    mime_type: &'a str,
    length: usize,
    properties: &'a BTreeMap<String, String>,
}

impl<'a> ContentSummary<'a> {
    fn of(content: &'a DocumentContent) -> Self {
        Self {
            mime_type: &content.mime_type,
            length: content.content.len(),
            properties: &content.properties,
        }
    }
}

/// Prints events to stdout.
///
/// Additions are looked up in the content store first; a document removed
/// since it was listed fails delivery for that document only.
pub struct PrintingSink<S: ContentStore> {
    store: Arc<S>,
    format: OutputFormat,
}

impl<S: ContentStore> PrintingSink<S> {
    /// Creates a sink.
    pub fn new(store: Arc<S>, format: OutputFormat) -> Self {
        Self { store, format }
    }

    fn render(&self, event: &DocumentEvent, content: Option<&DocumentContent>) -> DriverResult<String> {
        match self.format {
            OutputFormat::Json => {
                let mut line = serde_json::to_value(event).map_err(encode_error)?;
                if let Some(content) = content {
                    line["content"] =
                        serde_json::to_value(ContentSummary::of(content)).map_err(encode_error)?;
                }
                serde_json::to_string(&line).map_err(encode_error)
            }
            OutputFormat::Text => Ok(match event {
                DocumentEvent::Add(add) => format!(
                    "ADD    {} {} ({} bytes)",
                    format_timestamp(&add.modify_time),
                    add.id,
                    content.map_or(0, |c| c.content.len())
                ),
                DocumentEvent::Delete(delete) => format!(
                    "DELETE {} {} [{}]",
                    format_timestamp(&delete.observed_time),
                    delete.version_series_id,
                    delete.source
                ),
                DocumentEvent::Acl(acl) => format!(
                    "ACL    {} allow users={} deny users={} allow groups={} deny groups={} documents={}",
                    acl.id,
                    acl.acl.allow_users.len(),
                    acl.acl.deny_users.len(),
                    acl.acl.allow_groups.len(),
                    acl.acl.deny_groups.len(),
                    acl.documents.len()
                ),
            }),
        }
    }
}

fn encode_error(e: serde_json::Error) -> DriverError {
    DriverError::store(format!("cannot encode event: {e}"))
}

impl<S: ContentStore> DocumentSink for PrintingSink<S> {
    fn deliver(&self, event: &DocumentEvent) -> DriverResult<()> {
        let content = match event {
            DocumentEvent::Add(add) => Some(
                self.store
                    .fetch_document(&add.id)
                    .map_err(|e| DriverError::store(e.to_string()))?,
            ),
            _ => None,
        };
        println!("{}", self.render(event, content.as_ref())?);
        Ok(())
    }
}
