//! Thin async HTTP client for the WebDAV/CalDAV verbs feedsync needs.

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use url::Url;

/// Connection settings for a CalDAV server.
#[derive(Debug, Clone)]
pub struct CalDavConfig {
    /// Server, principal or calendar URL
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A multistatus (or other successful) response body and the URL it came from
/// after redirects. Hrefs in the body are resolved against `url`.
#[derive(Debug)]
pub struct DavResponse {
    pub url: Url,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct CalDavClient {
    http: reqwest::Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl CalDavClient {
    pub fn new(config: &CalDavConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .with_context(|| format!("Invalid CalDAV URL: {}", config.url))?;

        // Servers like iCloud redirect to a user-specific host
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(CalDavClient {
            http,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an href (absolute or server-relative) against `base`.
    pub fn resolve(base: &Url, href: &str) -> Result<Url> {
        base.join(href)
            .with_context(|| format!("Invalid href '{}' relative to {}", href, base))
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.username {
            Some(username) => builder.basic_auth(username, self.password.as_deref()),
            None => builder,
        }
    }

    pub async fn propfind(&self, url: &Url, depth: u8, body: &str) -> Result<DavResponse> {
        self.dav_request("PROPFIND", url, depth, body).await
    }

    pub async fn report(&self, url: &Url, body: &str) -> Result<DavResponse> {
        self.dav_request("REPORT", url, 1, body).await
    }

    async fn dav_request(
        &self,
        verb: &str,
        url: &Url,
        depth: u8,
        body: &str,
    ) -> Result<DavResponse> {
        let method = Method::from_bytes(verb.as_bytes())
            .with_context(|| format!("Invalid HTTP method {}", verb))?;

        let response = self
            .request(method, url.clone())
            .header("Content-Type", "application/xml; charset=utf-8")
            .header("Depth", depth.to_string())
            .body(body.to_string())
            .send()
            .await
            .with_context(|| format!("{} {} failed", verb, url))?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            anyhow::bail!("{} {} returned status {}", verb, url, status);
        }

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok(DavResponse {
            url: final_url,
            body,
        })
    }

    /// Create a resource; fails if one already exists at `url`.
    pub async fn put_new(&self, url: &Url, ics: String) -> Result<()> {
        let response = self
            .request(Method::PUT, url.clone())
            .header("Content-Type", "text/calendar; charset=utf-8")
            .header("If-None-Match", "*")
            .body(ics)
            .send()
            .await
            .with_context(|| format!("PUT {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("PUT {} returned status {}: {}", url, status, error_body);
        }

        Ok(())
    }

    /// Delete a resource. A resource that is already gone counts as deleted.
    pub async fn delete(&self, url: &Url) -> Result<()> {
        let response = self
            .request(Method::DELETE, url.clone())
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("DELETE {} returned status {}: {}", url, status, error_body);
        }

        Ok(())
    }
}
