//! # Replay, Expiry and Oracle Resistance
//!
//! A nonce backs at most one attempt, dies after its TTL, and every failure
//! looks the same from the outside.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bootstrap_admin::ClientError;
    use bootstrap_core::wire::{RegisterRequest, REGISTER_PATH};
    use bootstrap_core::{MacCodec, RegistrationFields, SharedSecret};
    use reqwest::StatusCode;

    use crate::integration::fixture::{enabled_config, TestGateway, SECRET};

    fn codec(secret: &str) -> MacCodec {
        MacCodec::new(SharedSecret::new(secret).unwrap())
    }

    fn signed(nonce: &str, username: &str, secret: &str) -> RegisterRequest {
        let fields = RegistrationFields::new(nonce, username, "S3cret!", true);
        let mac = codec(secret).sign_fields(&fields);
        RegisterRequest {
            nonce: fields.nonce,
            username: fields.username,
            password: fields.password,
            admin: true,
            user_type: None,
            displayname: None,
            mac,
        }
    }

    async fn post(gateway: &TestGateway, body: &RegisterRequest) -> (StatusCode, String) {
        let response = reqwest::Client::new()
            .post(format!("{}{}", gateway.url(), REGISTER_PATH))
            .json(body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.text().await.unwrap())
    }

    #[tokio::test]
    async fn test_replay_is_denied() {
        let gateway = TestGateway::start().await;
        let nonce = gateway.client().fetch_nonce().await.unwrap();

        let request = signed(&nonce, "alice", SECRET);
        let (status, _) = post(&gateway, &request).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = post(&gateway, &request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("M_FORBIDDEN"));

        gateway.stop().await;
    }

    #[tokio::test]
    async fn test_bad_signature_burns_nonce() {
        let gateway = TestGateway::start().await;
        let nonce = gateway.client().fetch_nonce().await.unwrap();

        let (status, _) = post(&gateway, &signed(&nonce, "alice", "wrong")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Correct MAC on the same nonce is too late
        let (status, _) = post(&gateway, &signed(&nonce, "alice", SECRET)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        gateway.stop().await;
    }

    #[tokio::test]
    async fn test_expired_nonce_is_denied() {
        let mut config = enabled_config();
        config.registration.nonce_ttl = Duration::from_millis(200);
        let gateway = TestGateway::start_with(config).await;

        let nonce = gateway.client().fetch_nonce().await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        let (status, _) = post(&gateway, &signed(&nonce, "alice", SECRET)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        gateway.stop().await;
    }

    #[tokio::test]
    async fn test_denials_are_indistinguishable() {
        let mut config = enabled_config();
        config.registration.nonce_ttl = Duration::from_millis(200);
        let gateway = TestGateway::start_with(config).await;
        let client = gateway.client();

        // unknown nonce
        let unknown = post(&gateway, &signed("deadbeef", "u1", SECRET)).await;

        // wrong digest
        let fresh = client.fetch_nonce().await.unwrap();
        let wrong_mac = post(&gateway, &signed(&fresh, "u2", "wrong")).await;

        // reused nonce
        let used = client.fetch_nonce().await.unwrap();
        assert_eq!(post(&gateway, &signed(&used, "u3", SECRET)).await.0, StatusCode::OK);
        let reused = post(&gateway, &signed(&used, "u4", SECRET)).await;

        // expired nonce
        let stale = client.fetch_nonce().await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        let expired = post(&gateway, &signed(&stale, "u5", SECRET)).await;

        assert_eq!(unknown.0, StatusCode::FORBIDDEN);
        for other in [&wrong_mac, &reused, &expired] {
            assert_eq!(other, &unknown);
        }

        gateway.stop().await;
    }

    #[tokio::test]
    async fn test_concurrent_submissions_single_winner() {
        let gateway = TestGateway::start().await;
        let client = Arc::new(gateway.client());
        let nonce = client.fetch_nonce().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let client = Arc::clone(&client);
            let nonce = nonce.clone();
            handles.push(tokio::spawn(async move {
                let fields = RegistrationFields::new(nonce, format!("racer{i}"), "pw", true);
                client.submit(fields, None).await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(ClientError::Rejected { status, .. }) => {
                    assert_eq!(status, StatusCode::FORBIDDEN)
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);

        let metrics = gateway.metrics().await;
        assert_eq!(metrics["registration"]["authorized"], 1);
        assert_eq!(metrics["registration"]["denied"], 7);

        gateway.stop().await;
    }
}
