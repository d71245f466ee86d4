//! Loading cubes over `http` and `https`.
//!
//! Requests are blocking and made one location at a time, on the thread
//! pulling the stream. Without the `http` feature every network location
//! fails with [`StrataError::NotSupported`].

use super::{Callback, CubeStream, FormatRegistry, SchemeLoader};
use crate::prelude::*;

/// Loads `http`/`https` locations given as full URIs.
#[derive(Debug, Clone, Default)]
pub struct HttpLoader {
    formats: FormatRegistry,
    #[cfg(feature = "http")]
    client: reqwest::blocking::Client,
}

impl HttpLoader {
    pub fn new(formats: FormatRegistry) -> Self {
        Self {
            formats,
            #[cfg(feature = "http")]
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Uses `client` for every request.
    #[cfg(feature = "http")]
    pub fn with_client(mut self, client: reqwest::blocking::Client) -> Self {
        self.client = client;
        self
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }
}

#[cfg(feature = "http")]
impl SchemeLoader for HttpLoader {
    fn load<'a>(&'a self, locations: Vec<String>, callback: Option<&'a Callback<'a>>) -> CubeStream<'a> {
        use super::{DecodedCubes, FieldStream};
        use std::io::BufReader;

        let resolve = Box::new(move || Ok(locations));
        let open = Box::new(move |uri: &str| -> Result<FieldStream<'a>> {
            let url = url::Url::parse(uri)
                .map_err(|e| StrataError::InvalidLocation(format!("{uri}: {e}")))?;
            let decoder = self.formats.find(url.path())?;
            let response = self
                .client
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| StrataError::Http(format!("{uri}: {e}")))?;
            Ok(decoder.decode(Box::new(BufReader::new(response)), uri))
        });
        Box::new(DecodedCubes::new(resolve, open, callback))
    }
}

#[cfg(not(feature = "http"))]
impl SchemeLoader for HttpLoader {
    fn load<'a>(&'a self, locations: Vec<String>, _callback: Option<&'a Callback<'a>>) -> CubeStream<'a> {
        let first = locations.into_iter().next().unwrap_or_default();
        Box::new(std::iter::once(Err(StrataError::NotSupported(format!(
            "cannot load {first}: network loading requires the `http` feature"
        )))))
    }
}
