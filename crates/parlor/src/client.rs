// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin admin-API client used by the import, backup, restore, remap and
//! cleanup subcommands.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::StatusCode;
use tracing::info;

use parlor_config::ParlorConfig;
use parlor_core::{Comment, ParlorError, PostInfo};

pub struct AdminClient {
    http: reqwest::Client,
    base: String,
    passwd: String,
}

fn http_err(message: impl Into<String>, e: reqwest::Error) -> ParlorError {
    ParlorError::Http {
        message: message.into(),
        source: Some(Box::new(e)),
    }
}

impl AdminClient {
    pub fn new(config: &ParlorConfig) -> Result<Self, ParlorError> {
        if config.server.admin_passwd.is_empty() {
            return Err(ParlorError::Config(
                "admin_passwd is required for admin API commands".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| http_err("admin client", e))?;
        Ok(Self {
            http,
            base: config.server.url.trim_end_matches('/').to_string(),
            passwd: config.server.admin_passwd.clone(),
        })
    }

    async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response, ParlorError> {
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ParlorError::RateLimited);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ParlorError::Http {
                message: format!("{what} failed with {status}: {body}"),
                source: None,
            });
        }
        Ok(resp)
    }

    pub async fn export(&self, site: &str) -> Result<Vec<u8>, ParlorError> {
        let url = format!("{}/api/v1/admin/export?site={site}&mode=file", self.base);
        let resp = self
            .http
            .get(&url)
            .basic_auth("admin", Some(&self.passwd))
            .send()
            .await
            .map_err(|e| http_err("export request", e))?;
        let resp = Self::check(resp, "export").await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| http_err("export body", e))?;
        Ok(bytes.to_vec())
    }

    pub async fn import(
        &self,
        site: &str,
        provider: &str,
        body: String,
    ) -> Result<usize, ParlorError> {
        let url = format!(
            "{}/api/v1/admin/import?site={site}&provider={provider}",
            self.base
        );
        let resp = self
            .http
            .post(&url)
            .basic_auth("admin", Some(&self.passwd))
            .body(body)
            .send()
            .await
            .map_err(|e| http_err("import request", e))?;
        let resp = Self::check(resp, "import").await?;
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| http_err("import response", e))?;
        Ok(value["size"].as_u64().unwrap_or(0) as usize)
    }

    pub async fn remap(&self, site: &str, rules: String) -> Result<usize, ParlorError> {
        let url = format!("{}/api/v1/admin/remap?site={site}", self.base);
        let resp = self
            .http
            .post(&url)
            .basic_auth("admin", Some(&self.passwd))
            .body(rules)
            .send()
            .await
            .map_err(|e| http_err("remap request", e))?;
        let resp = Self::check(resp, "remap").await?;
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| http_err("remap response", e))?;
        Ok(value["size"].as_u64().unwrap_or(0) as usize)
    }

    pub async fn list(&self, site: &str) -> Result<Vec<PostInfo>, ParlorError> {
        let url = format!("{}/api/v1/list?site={site}", self.base);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| http_err("list request", e))?;
        let resp = Self::check(resp, "list").await?;
        resp.json().await.map_err(|e| http_err("list response", e))
    }

    pub async fn find(&self, site: &str, post_url: &str) -> Result<Vec<Comment>, ParlorError> {
        let url = format!("{}/api/v1/find", self.base);
        let resp = self
            .http
            .get(&url)
            .query(&[("site", site), ("url", post_url)])
            .basic_auth("admin", Some(&self.passwd))
            .send()
            .await
            .map_err(|e| http_err("find request", e))?;
        let resp = Self::check(resp, "find").await?;
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| http_err("find response", e))?;
        serde_json::from_value(value["comments"].clone()).map_err(ParlorError::storage)
    }

    pub async fn delete_comment(
        &self,
        site: &str,
        post_url: &str,
        id: &str,
    ) -> Result<(), ParlorError> {
        let url = format!("{}/api/v1/admin/comment/{id}", self.base);
        let resp = self
            .http
            .delete(&url)
            .query(&[("site", site), ("url", post_url)])
            .basic_auth("admin", Some(&self.passwd))
            .send()
            .await
            .map_err(|e| http_err("delete request", e))?;
        Self::check(resp, "delete").await?;
        Ok(())
    }
}

pub async fn run_import(
    config: &ParlorConfig,
    site: &str,
    file: &Path,
    provider: &str,
) -> Result<(), ParlorError> {
    let client = AdminClient::new(config)?;
    let body = tokio::fs::read_to_string(file)
        .await
        .map_err(ParlorError::storage)?;
    let size = client.import(site, provider, body).await?;
    info!(site, size, "import finished");
    Ok(())
}

pub async fn run_backup(
    config: &ParlorConfig,
    site: &str,
    file: Option<PathBuf>,
) -> Result<(), ParlorError> {
    let client = AdminClient::new(config)?;
    let dump = client.export(site).await?;
    let path = file.unwrap_or_else(|| {
        PathBuf::from(format!(
            "backup-{site}-{}.gz",
            chrono::Utc::now().format("%Y%m%d")
        ))
    });
    tokio::fs::write(&path, &dump)
        .await
        .map_err(ParlorError::storage)?;
    info!(site, path = %path.display(), bytes = dump.len(), "backup written");
    Ok(())
}

pub async fn run_restore(
    config: &ParlorConfig,
    site: &str,
    file: &Path,
) -> Result<(), ParlorError> {
    let client = AdminClient::new(config)?;
    let gz = tokio::fs::read(file).await.map_err(ParlorError::storage)?;
    let mut dump = String::new();
    GzDecoder::new(gz.as_slice())
        .read_to_string(&mut dump)
        .map_err(ParlorError::storage)?;
    let size = client.import(site, "native", dump).await?;
    info!(site, size, "restore finished");
    Ok(())
}

pub async fn run_remap(
    config: &ParlorConfig,
    site: &str,
    file: &Path,
) -> Result<(), ParlorError> {
    let client = AdminClient::new(config)?;
    let rules = tokio::fs::read_to_string(file)
        .await
        .map_err(ParlorError::storage)?;
    let size = client.remap(site, rules).await?;
    info!(site, size, "remap finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write as _;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use wiremock::matchers::{basic_auth, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base: &str) -> ParlorConfig {
        let mut config = ParlorConfig::default();
        config.server.url = base.to_string();
        config.server.admin_passwd = "pw".into();
        config
    }

    #[tokio::test]
    async fn find_sends_post_url_as_query_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/find"))
            .and(query_param("site", "site-1"))
            .and(query_param("url", "https://example.com/p?a=1&b=2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "comments": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = AdminClient::new(&config_for(&server.uri())).unwrap();
        let comments = client
            .find("site-1", "https://example.com/p?a=1&b=2")
            .await
            .unwrap();
        assert!(comments.is_empty());
    }

    #[tokio::test]
    async fn restore_reads_gz_and_posts_native_dump() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/admin/import"))
            .and(query_param("provider", "native"))
            .and(basic_auth("admin", "pw"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "size": 1 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let gz_path = dir.path().join("dump.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(b"{\"version\":1,\"users\":[],\"posts\":[]}\n")
            .unwrap();
        std::fs::write(&gz_path, encoder.finish().unwrap()).unwrap();

        run_restore(&config_for(&server.uri()), "site-1", &gz_path)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn too_many_requests_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = AdminClient::new(&config_for(&server.uri())).unwrap();
        let err = client
            .delete_comment("site-1", "https://example.com/p", "c1")
            .await
            .unwrap_err();
        assert!(matches!(err, ParlorError::RateLimited));
    }
}
