//! # Registration Flow
//!
//! Client fetches a nonce, signs `nonce\0user\0password\0admin` and the gateway
//! creates the account. Covers the happy path, the optional fields and the
//! disabled and wrong-secret rejections.

#[cfg(test)]
mod tests {
    use bootstrap_admin::{ClientError, RegisterOptions};
    use bootstrap_gateway::GatewayConfig;
    use reqwest::StatusCode;

    use crate::integration::fixture::TestGateway;

    #[tokio::test]
    async fn test_admin_registration_succeeds() {
        let gateway = TestGateway::start().await;
        let client = gateway.client();

        let account = client
            .register("alice", "S3cret!", Some("Alice"), true)
            .await
            .unwrap();

        assert_eq!(account.user_id, "@alice:localhost");
        assert_eq!(account.device_id.len(), 10);
        assert_eq!(account.access_token.len(), 64);
        assert!(account.refresh_token.is_some());
        assert_eq!(account.home_server.as_deref(), Some("localhost"));
        assert_eq!(account.expires_in, 3600);

        let metrics = gateway.metrics().await;
        assert_eq!(metrics["registration"]["authorized"], 1);
        assert_eq!(metrics["registration"]["accounts_created"], 1);

        gateway.stop().await;
    }

    #[tokio::test]
    async fn test_regular_user_with_user_type() {
        let gateway = TestGateway::start().await;
        let client = gateway.client();

        let mut options = RegisterOptions::new("bot1", "pw");
        options.admin = false;
        options.user_type = Some("bot".into());
        let account = client.register_with(&options).await.unwrap();
        assert_eq!(account.user_id, "@bot1:localhost");

        gateway.stop().await;
    }

    #[tokio::test]
    async fn test_wrong_secret_is_denied() {
        let gateway = TestGateway::start().await;
        let client = gateway.client_with_secret("not_the_secret");

        match client.register("mallory", "pw", None, true).await {
            Err(ClientError::Rejected {
                status,
                errcode,
                message,
            }) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(errcode, "M_FORBIDDEN");
                assert_eq!(message, "Registration denied");
            }
            other => panic!("expected denial, got {other:?}"),
        }

        // A fresh attempt with the right secret still works
        gateway
            .client()
            .register("mallory", "pw", None, true)
            .await
            .unwrap();

        gateway.stop().await;
    }

    #[tokio::test]
    async fn test_username_taken() {
        let gateway = TestGateway::start().await;
        let client = gateway.client();

        client.register("alice", "pw", None, true).await.unwrap();
        match client.register("alice", "pw", None, true).await {
            Err(ClientError::Rejected { errcode, .. }) => assert_eq!(errcode, "M_USER_IN_USE"),
            other => panic!("expected M_USER_IN_USE, got {other:?}"),
        }

        gateway.stop().await;
    }

    #[tokio::test]
    async fn test_disabled_gateway_refuses_nonces() {
        let gateway = TestGateway::start_with(GatewayConfig::default()).await;

        let response = reqwest::get(format!(
            "{}{}",
            gateway.url(),
            bootstrap_core::wire::NONCE_PATH
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["errcode"], "M_FORBIDDEN");

        assert!(matches!(
            gateway.client().fetch_nonce().await,
            Err(ClientError::NonceUnavailable(_))
        ));

        gateway.stop().await;
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let gateway = TestGateway::start().await;

        let response = reqwest::get(format!("{}/health", gateway.url())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        gateway.stop().await;
    }
}
