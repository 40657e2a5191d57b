#![deny(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{blocking::Client, blocking::Response, header::CONTENT_TYPE, Url};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ContextError;

/// An endpoint which does not serve a picture directly but a JSON document whose `message` field
/// is the URL of the actual picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperEndpoint {
    pub host: String,
    pub path_prefix: String,
}

impl WrapperEndpoint {
    pub fn new<S: Into<String>>(host: S, path_prefix: S) -> Self {
        WrapperEndpoint {
            host: host.into(),
            path_prefix: path_prefix.into(),
        }
    }

    /// The random dog pictures API, `https://dog.ceo/api/...`.
    pub fn dog_api() -> Self {
        WrapperEndpoint::new("dog.ceo", "/api/")
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some(self.host.as_str()) && url.path().starts_with(&self.path_prefix)
    }
}

#[derive(Debug, Deserialize)]
struct WrapperResponse {
    message: Option<String>,
}

/// Downloads the pictures of the people, one blocking request after the other.
pub struct ImageFetcher {
    client: Client,
    wrapper_endpoints: Vec<WrapperEndpoint>,
}

impl ImageFetcher {
    /// Creates a fetcher which knows about the dog API as its only wrapper endpoint. Requests are
    /// always sent directly, the proxy environment variables are not read.
    pub fn new() -> Result<Self, ContextError> {
        let client = Client::builder()
            .user_agent(concat!("contact-sheet/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .map_err(|error| ContextError::with_error("Unable to build the HTTP client", &error))?;

        Ok(ImageFetcher {
            client,
            wrapper_endpoints: vec![WrapperEndpoint::dog_api()],
        })
    }

    /// Replaces the known wrapper endpoints.
    pub fn with_wrapper_endpoints(mut self, wrapper_endpoints: Vec<WrapperEndpoint>) -> Self {
        self.wrapper_endpoints = wrapper_endpoints;
        self
    }

    pub fn is_wrapper_url(&self, url: &Url) -> bool {
        self.wrapper_endpoints
            .iter()
            .any(|wrapper_endpoint| wrapper_endpoint.matches(url))
    }

    /// Downloads the picture at the given URL and writes its bytes verbatim to `target_path`,
    /// which is returned on success. Wrapper endpoints are resolved to the picture they point to.
    /// The response must declare an `image/*` content type.
    pub fn fetch_image(&self, url: &str, target_path: &Path) -> Result<PathBuf, ContextError> {
        let parsed_url = Url::parse(url).map_err(|error| {
            ContextError::with_error(format!("Invalid image URL {:?}", url), &error)
        })?;

        let mut response = self.get(parsed_url.clone())?;
        if self.is_wrapper_url(&parsed_url) {
            let response_body = response.bytes().map_err(|error| {
                ContextError::with_error(
                    format!("Unable to read the wrapper endpoint response of {:?}", url),
                    &error,
                )
            })?;
            let wrapper_response: WrapperResponse = serde_json::from_slice(&response_body)
                .map_err(|error| {
                    ContextError::with_error(
                        format!("Unable to parse the wrapper endpoint response of {:?}", url),
                        &error,
                    )
                })?;
            let actual_url = wrapper_response.message.ok_or(ContextError::with_context(
                format!("The wrapper endpoint response of {:?} has no message", url),
            ))?;
            log::debug!("Resolved the wrapper endpoint {:?} to {:?}", url, actual_url);

            let actual_url = Url::parse(&actual_url).map_err(|error| {
                ContextError::with_error(format!("Invalid image URL {:?}", actual_url), &error)
            })?;
            response = self.get(actual_url)?;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(ContextError::with_context(format!(
                "Invalid content type for image: {:?}",
                content_type
            )));
        }

        let image_bytes = response.bytes().map_err(|error| {
            ContextError::with_error(format!("Unable to read the image body of {:?}", url), &error)
        })?;
        std::fs::write(target_path, &image_bytes).map_err(|error| {
            ContextError::with_error(format!("Unable to save the image to {:?}", target_path), &error)
        })?;
        log::info!("Successfully downloaded image to: {:?}", target_path);

        Ok(target_path.to_path_buf())
    }

    fn get(&self, url: Url) -> Result<Response, ContextError> {
        let response = self.client.get(url.clone()).send().map_err(|error| {
            ContextError::with_error(format!("Network error downloading {}", url), &error)
        })?;
        response.error_for_status().map_err(|error| {
            ContextError::with_error(format!("Request to {} failed", url), &error)
        })
    }
}
