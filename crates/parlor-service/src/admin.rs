// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin store variants: static (from configuration) and remote RPC.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use parlor_core::{AdminStore, ParlorError};

/// Site administration data taken straight from the config file. The same
/// secret, admin list and email apply to every configured site.
pub struct StaticAdminStore {
    secret: String,
    admins: Vec<String>,
    email: String,
    sites: Vec<String>,
}

impl StaticAdminStore {
    pub fn new(secret: String, admins: Vec<String>, email: String, sites: Vec<String>) -> Self {
        Self {
            secret,
            admins,
            email,
            sites,
        }
    }
}

#[async_trait]
impl AdminStore for StaticAdminStore {
    async fn key(&self, _site: &str) -> Result<String, ParlorError> {
        if self.secret.is_empty() {
            return Err(ParlorError::Config("site secret is not set".into()));
        }
        Ok(self.secret.clone())
    }

    async fn admins(&self, _site: &str) -> Result<Vec<String>, ParlorError> {
        Ok(self.admins.clone())
    }

    async fn email(&self, _site: &str) -> Result<String, ParlorError> {
        Ok(self.email.clone())
    }

    async fn enabled(&self, site: &str) -> Result<bool, ParlorError> {
        Ok(self.sites.iter().any(|s| s == site))
    }
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Admin store served by an external RPC endpoint. Each call POSTs
/// `{"method": "admin.<op>", "params": {"site": ...}}` and reads `result`.
pub struct RpcAdminStore {
    client: reqwest::Client,
    url: String,
}

impl RpcAdminStore {
    pub fn new(url: String) -> Result<Self, ParlorError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| ParlorError::Http {
                message: "rpc admin client".into(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client, url })
    }

    async fn call(&self, method: &str, site: &str) -> Result<serde_json::Value, ParlorError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({"method": method, "params": {"site": site}}))
            .send()
            .await
            .map_err(|e| ParlorError::Http {
                message: format!("rpc {method} for {site}"),
                source: Some(Box::new(e)),
            })?;
        if !resp.status().is_success() {
            return Err(ParlorError::Http {
                message: format!("rpc {method} returned {}", resp.status()),
                source: None,
            });
        }
        let body: RpcResponse = resp.json().await.map_err(|e| ParlorError::Http {
            message: format!("rpc {method} body"),
            source: Some(Box::new(e)),
        })?;
        if let Some(err) = body.error {
            return Err(ParlorError::Http {
                message: format!("rpc {method}: {err}"),
                source: None,
            });
        }
        Ok(body.result)
    }
}

#[async_trait]
impl AdminStore for RpcAdminStore {
    async fn key(&self, site: &str) -> Result<String, ParlorError> {
        let result = self.call("admin.key", site).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ParlorError::Http {
                message: "admin.key returned a non-string".into(),
                source: None,
            })
    }

    async fn admins(&self, site: &str) -> Result<Vec<String>, ParlorError> {
        let result = self.call("admin.admins", site).await?;
        serde_json::from_value(result).map_err(|e| ParlorError::Http {
            message: format!("admin.admins decode: {e}"),
            source: None,
        })
    }

    async fn email(&self, site: &str) -> Result<String, ParlorError> {
        let result = self.call("admin.email", site).await?;
        Ok(result.as_str().unwrap_or_default().to_string())
    }

    async fn enabled(&self, site: &str) -> Result<bool, ParlorError> {
        let result = self.call("admin.enabled", site).await?;
        Ok(result.as_bool().unwrap_or(false))
    }
}

/// Configured admin store choice.
pub enum AdminStores {
    Static(StaticAdminStore),
    Rpc(RpcAdminStore),
}

#[async_trait]
impl AdminStore for AdminStores {
    async fn key(&self, site: &str) -> Result<String, ParlorError> {
        match self {
            Self::Static(s) => s.key(site).await,
            Self::Rpc(r) => r.key(site).await,
        }
    }

    async fn admins(&self, site: &str) -> Result<Vec<String>, ParlorError> {
        match self {
            Self::Static(s) => s.admins(site).await,
            Self::Rpc(r) => r.admins(site).await,
        }
    }

    async fn email(&self, site: &str) -> Result<String, ParlorError> {
        match self {
            Self::Static(s) => s.email(site).await,
            Self::Rpc(r) => r.email(site).await,
        }
    }

    async fn enabled(&self, site: &str) -> Result<bool, ParlorError> {
        match self {
            Self::Static(s) => s.enabled(site).await,
            Self::Rpc(r) => r.enabled(site).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn static_store_serves_config_values() {
        let store = StaticAdminStore::new(
            "s3cret".into(),
            vec!["admin-1".into()],
            "mod@example.com".into(),
            vec!["site-1".into()],
        );
        assert_eq!(store.key("site-1").await.unwrap(), "s3cret");
        assert_eq!(store.admins("site-1").await.unwrap(), vec!["admin-1"]);
        assert_eq!(store.email("site-1").await.unwrap(), "mod@example.com");
        assert!(store.enabled("site-1").await.unwrap());
        assert!(!store.enabled("unknown").await.unwrap());
    }

    #[tokio::test]
    async fn static_store_requires_secret() {
        let store = StaticAdminStore::new(String::new(), vec![], String::new(), vec![]);
        assert!(matches!(
            store.key("site-1").await,
            Err(ParlorError::Config(_))
        ));
    }

    #[tokio::test]
    async fn rpc_store_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .and(body_partial_json(serde_json::json!({"method": "admin.key"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "remote-secret"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .and(body_partial_json(serde_json::json!({"method": "admin.admins"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": ["a1", "a2"]
            })))
            .mount(&server)
            .await;

        let store = RpcAdminStore::new(format!("{}/rpc", server.uri())).unwrap();
        assert_eq!(store.key("site-1").await.unwrap(), "remote-secret");
        assert_eq!(store.admins("site-1").await.unwrap(), vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn rpc_store_surfaces_remote_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "no such site"
            })))
            .mount(&server)
            .await;

        let store = RpcAdminStore::new(server.uri()).unwrap();
        let err = store.key("ghost").await.unwrap_err();
        assert!(err.to_string().contains("no such site"));
    }
}
