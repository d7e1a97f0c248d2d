// Media source locator

use crate::error::{Result, SessionError};
use serde_json::Value;
use std::path::Path;

/// How a locator should be resolved by the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// http:// or https://
    Remote,
    /// content:// provider URI
    Content,
    /// file:// URI
    File,
    /// asset:// URI
    Asset,
    /// Bare name of a resource bundled with the host application
    Resource,
}

impl SourceKind {
    fn classify(uri: &str) -> Self {
        const SCHEMES: [(&str, SourceKind); 5] = [
            ("http://", SourceKind::Remote),
            ("https://", SourceKind::Remote),
            ("content://", SourceKind::Content),
            ("file://", SourceKind::File),
            ("asset://", SourceKind::Asset),
        ];

        SCHEMES
            .iter()
            .find(|(scheme, _)| uri.starts_with(scheme))
            .map(|(_, kind)| *kind)
            .unwrap_or(SourceKind::Resource)
    }
}

/// Immutable identity of a session: locator plus optional format override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    uri: String,
    overriding_extension: Option<String>,
    kind: SourceKind,
}

impl MediaSource {
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(SessionError::InvalidArgument(
                "Media source URI must not be empty.".to_string(),
            ));
        }
        let kind = SourceKind::classify(&uri);
        Ok(Self {
            uri,
            overriding_extension: None,
            kind,
        })
    }

    /// Force the container format instead of inferring it from the URI
    pub fn with_overriding_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let extension = extension.trim_start_matches('.');
        self.overriding_extension = if extension.is_empty() {
            None
        } else {
            Some(extension.to_string())
        };
        self
    }

    /// Build from a `{ "uri": ..., "overridingExtension": ... }` document
    pub fn from_document(document: &Value) -> Result<Self> {
        let uri = document
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SessionError::InvalidArgument("Source document needs a string `uri`.".to_string())
            })?;

        let source = Self::new(uri)?;
        match document.get("overridingExtension") {
            None | Some(Value::Null) => Ok(source),
            Some(Value::String(extension)) => Ok(source.with_overriding_extension(extension.as_str())),
            Some(other) => Err(SessionError::InvalidArgument(format!(
                "`overridingExtension` must be a string, got {}",
                other
            ))),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn overriding_extension(&self) -> Option<&str> {
        self.overriding_extension.as_deref()
    }

    pub fn is_remote(&self) -> bool {
        self.kind == SourceKind::Remote
    }

    /// Format hint for engine selection: the override, else the URI path's extension
    pub fn extension_hint(&self) -> Option<&str> {
        if let Some(extension) = self.overriding_extension() {
            return Some(extension);
        }

        let path = self
            .uri
            .split(['?', '#'])
            .next()
            .unwrap_or(&self.uri);
        // Drop scheme and authority so a bare host never reads as an extension
        let path = match path.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
            None => path,
        };
        Path::new(path).extension().and_then(|ext| ext.to_str())
    }
}
