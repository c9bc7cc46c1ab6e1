// src/fetch/mod.rs

use anyhow::{bail, Context, Result};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use url::Url;

use crate::config::ApiConfig;
use crate::response::{ApiFailure, FailureKind, RawResponse};

pub mod auth;
pub mod overview;

pub use auth::user_id_from_login;

/// Thin wrapper over a cookie-keeping `reqwest::Client`. It only performs
/// requests and hands back `RawResponse`s; classification lives in
/// `crate::response`.
pub struct PelotonClient {
    client: Client,
    base: Url,
    api: ApiConfig,
}

impl PelotonClient {
    pub fn new(api: ApiConfig) -> Result<Self> {
        let base = Url::parse(&api.base_url)
            .with_context(|| format!("parsing base URL {}", api.base_url))?;
        if base.cannot_be_a_base() {
            bail!("base URL {} cannot carry a path", api.base_url);
        }
        let client = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, base, api })
    }

    /// The base URL with `segments` appended to whatever path it already
    /// has. Segments are percent-encoded, so `?`, `#` or `/` inside an id
    /// stay part of that segment.
    fn endpoint<I>(&self, segments: I, context: &str) -> Result<Url, ApiFailure>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiFailure {
                kind: FailureKind::Unexpected,
                context: context.to_string(),
                status: None,
                message: format!("cannot append a path to {}", self.base),
                raw_text: None,
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send and read the whole body. Transport errors come back untouched.
    async fn send(&self, req: RequestBuilder) -> Result<RawResponse, reqwest::Error> {
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok(RawResponse::new(status, body.to_vec()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_base_url() {
        let api = ApiConfig {
            base_url: "not a url".into(),
            ..ApiConfig::default()
        };
        assert!(PelotonClient::new(api).is_err());

        let api = ApiConfig {
            base_url: "mailto:rider@example.com".into(),
            ..ApiConfig::default()
        };
        assert!(PelotonClient::new(api).is_err());
    }

    #[test]
    fn endpoints_keep_the_base_path() {
        for base in ["http://127.0.0.1:8080/peloton", "http://127.0.0.1:8080/peloton/"] {
            let client = PelotonClient::new(ApiConfig {
                base_url: base.into(),
                ..ApiConfig::default()
            })
            .unwrap();
            assert_eq!(
                client.endpoint(["auth", "login"], "test").unwrap().as_str(),
                "http://127.0.0.1:8080/peloton/auth/login"
            );
        }
    }

    #[test]
    fn endpoint_segments_are_encoded() {
        let client = PelotonClient::new(ApiConfig::default()).unwrap();
        let url = client
            .endpoint(["api", "user", "a?b#c/d", "overview"], "test")
            .unwrap();
        assert_eq!(url.path(), "/api/user/a%3Fb%23c%2Fd/overview");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[tokio::test]
    async fn send_reads_status_and_body() {
        let (base, server) = test_server::serve_once(418, "teapot").await;
        let client = PelotonClient::new(ApiConfig {
            base_url: base,
            ..ApiConfig::default()
        })
        .unwrap();

        let url = client.endpoint(["brew"], "test").unwrap();
        let raw = client.send(client.client.get(url)).await.unwrap();

        assert_eq!(raw.status, 418);
        assert_eq!(raw.text(), "teapot");
        assert!(server.await.unwrap().starts_with("GET /brew HTTP/1.1"));
    }
}
