// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WeChat subscription-message API.
//!
//! Provides [`WechatClient`], which fetches an access token with the
//! mini-application's own credentials and submits templated notifications.
//! Each call is a single attempt; retrying is left to the next push.

use std::time::Duration;

use async_trait::async_trait;
use kefu_config::model::PushConfig;
use kefu_core::types::{AccessToken, ProviderReply, TemplateMessage};
use kefu_core::{Adapter, AdapterType, HealthStatus, KefuError, MiniApp, PushProvider};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    touser: &'a str,
    template_id: &'a str,
    page: &'a str,
    miniprogram_state: &'a str,
    lang: &'a str,
    data: TemplateData<'a>,
}

#[derive(Debug, Serialize)]
struct TemplateData<'a> {
    name1: Field<'a>,
    thing2: Field<'a>,
    time2: Field<'a>,
}

#[derive(Debug, Serialize)]
struct Field<'a> {
    value: &'a str,
}

/// WeChat subscription-message client.
#[derive(Debug, Clone)]
pub struct WechatClient {
    client: reqwest::Client,
    base_url: String,
    page: String,
    miniprogram_state: String,
    lang: String,
}

impl WechatClient {
    pub fn new(config: &PushConfig) -> Result<Self, KefuError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| KefuError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page: config.page.clone(),
            miniprogram_state: config.miniprogram_state.clone(),
            lang: config.lang.clone(),
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, KefuError> {
        Url::parse_with_params(&format!("{}{path}", self.base_url), params).map_err(|e| {
            KefuError::Provider {
                message: format!("invalid provider URL: {e}"),
                source: Some(Box::new(e)),
            }
        })
    }
}

fn transport_err(context: &str, e: reqwest::Error) -> KefuError {
    KefuError::Provider {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl Adapter for WechatClient {
    fn name(&self) -> &str {
        "wechat"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::PushProvider
    }

    async fn health_check(&self) -> Result<HealthStatus, KefuError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl PushProvider for WechatClient {
    async fn access_token(&self, app: &MiniApp) -> Result<AccessToken, KefuError> {
        let url = self.endpoint(
            "/cgi-bin/token",
            &[
                ("grant_type", "client_credential"),
                ("appid", app.app_key.as_str()),
                ("secret", app.secret.as_str()),
            ],
        )?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_err("token request failed", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(KefuError::Provider {
                message: format!("token endpoint returned {status}"),
                source: None,
            });
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| transport_err("failed to parse token response", e))?;

        if body.errcode != 0 || body.access_token.is_empty() {
            return Err(KefuError::ProviderTransient {
                code: body.errcode,
                message: body.errmsg,
            });
        }
        debug!(app_key = %app.app_key, expires_in = body.expires_in, "access token obtained");
        Ok(AccessToken(body.access_token))
    }

    async fn send(
        &self,
        token: &AccessToken,
        message: &TemplateMessage,
    ) -> Result<ProviderReply, KefuError> {
        let url = self.endpoint(
            "/cgi-bin/message/subscribe/send",
            &[("access_token", token.0.as_str())],
        )?;
        let request = SendRequest {
            touser: &message.to_user,
            template_id: &message.template_id,
            page: &self.page,
            miniprogram_state: &self.miniprogram_state,
            lang: &self.lang,
            data: TemplateData {
                name1: Field {
                    value: &message.sender_label,
                },
                thing2: Field {
                    value: &message.content,
                },
                time2: Field {
                    value: &message.timestamp,
                },
            },
        };
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_err("send request failed", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(KefuError::Provider {
                message: format!("send endpoint returned {status}"),
                source: None,
            });
        }
        let reply: ProviderReply = response
            .json()
            .await
            .map_err(|e| transport_err("failed to parse send response", e))?;
        debug!(errcode = reply.errcode, "send response received");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kefu_core::{ErrorKind, MiniAppId};
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> WechatClient {
        let config = PushConfig {
            base_url: base_url.to_string(),
            ..PushConfig::default()
        };
        WechatClient::new(&config).unwrap()
    }

    fn app() -> MiniApp {
        MiniApp {
            id: MiniAppId(1),
            name: "Shop".into(),
            app_key: "wx-app".into(),
            secret: "wx-secret".into(),
            template_id: Some("tpl-1".into()),
        }
    }

    fn template() -> TemplateMessage {
        TemplateMessage {
            to_user: "openid-1".into(),
            template_id: "tpl-1".into(),
            sender_label: "Alice".into(),
            content: "hello".into(),
            timestamp: "2026-01-01 12:00:00".into(),
        }
    }

    #[tokio::test]
    async fn access_token_sends_app_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/token"))
            .and(query_param("grant_type", "client_credential"))
            .and(query_param("appid", "wx-app"))
            .and(query_param("secret", "wx-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-123",
                "expires_in": 7200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = test_client(&server.uri()).access_token(&app()).await.unwrap();
        assert_eq!(token, AccessToken("tok-123".into()));
    }

    #[tokio::test]
    async fn access_token_error_code_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "errcode": 40013,
                "errmsg": "invalid appid"
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .access_token(&app())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderTransient);
        assert!(err.to_string().contains("40013"));
    }

    #[tokio::test]
    async fn send_posts_template_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/message/subscribe/send"))
            .and(query_param("access_token", "tok-123"))
            .and(body_partial_json(serde_json::json!({
                "touser": "openid-1",
                "template_id": "tpl-1",
                "page": "pages/index/index?p=true",
                "miniprogram_state": "formal",
                "lang": "zh_CN",
                "data": {
                    "name1": {"value": "Alice"},
                    "thing2": {"value": "hello"},
                    "time2": {"value": "2026-01-01 12:00:00"}
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"errcode": 0, "errmsg": "ok"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = test_client(&server.uri())
            .send(&AccessToken("tok-123".into()), &template())
            .await
            .unwrap();
        assert_eq!(reply.errcode, 0);
    }

    #[tokio::test]
    async fn send_returns_provider_code_as_is() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/message/subscribe/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "errcode": 43101,
                "errmsg": "user refuse to accept the msg"
            })))
            .mount(&server)
            .await;

        let reply = test_client(&server.uri())
            .send(&AccessToken("tok".into()), &template())
            .await
            .unwrap();
        assert_eq!(reply.errcode, 43101);
        assert!(reply.errmsg.contains("refuse"));
    }

    #[tokio::test]
    async fn http_failure_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/message/subscribe/send"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .send(&AccessToken("tok".into()), &template())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
    }

    #[test]
    fn trailing_slash_in_base_url_is_ignored() {
        let client = test_client("http://127.0.0.1:1/");
        let url = client.endpoint("/cgi-bin/token", &[("a", "b")]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:1/cgi-bin/token?a=b");
    }
}
