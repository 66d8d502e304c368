// src/models/source.rs

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::FetchError;

/// Retrieval strategy selected by a descriptor's scheme prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    File,
}

impl Scheme {
    /// Supported prefixes, in match order.
    pub const SUPPORTED: [(&'static str, Scheme); 3] = [
        ("http://", Scheme::Http),
        ("https://", Scheme::Https),
        ("file://", Scheme::File),
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Scheme::Http => "http://",
            Scheme::Https => "https://",
            Scheme::File => "file://",
        }
    }
}

/// A validated source descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    raw: String,
    scheme: Scheme,
    path: Option<PathBuf>,
}

impl SourceDescriptor {
    /// Validate a raw descriptor string.
    ///
    /// Fails with [`FetchError::UnsupportedSource`] when `://` is missing, the
    /// scheme is not one of [`Scheme::SUPPORTED`], or an HTTP(S) descriptor is
    /// not a well-formed URL.
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        if !raw.contains("://") {
            return Err(FetchError::unsupported(raw, "no protocol found, missing ://"));
        }

        let scheme = Scheme::SUPPORTED
            .iter()
            .find(|(prefix, _)| raw.starts_with(prefix))
            .map(|(_, scheme)| *scheme)
            .ok_or_else(|| FetchError::unsupported(raw, "unsupported source protocol"))?;

        let path = match scheme {
            Scheme::Http | Scheme::Https => {
                Url::parse(raw).map_err(|e| FetchError::unsupported(raw, e))?;
                None
            }
            Scheme::File => {
                if raw.len() == Scheme::File.prefix().len() {
                    return Err(FetchError::unsupported(raw, "empty file path"));
                }
                let url = Url::parse(raw).map_err(|e| FetchError::unsupported(raw, e))?;
                let path = url.to_file_path().map_err(|()| {
                    FetchError::unsupported(raw, "not a local absolute file path")
                })?;
                Some(path)
            }
        };

        Ok(Self {
            raw: raw.to_string(),
            scheme,
            path,
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Local path for `file://` descriptors, percent-decoded.
    pub fn file_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
