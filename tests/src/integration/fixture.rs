//! Live gateway fixture bound to `127.0.0.1:0`.

use std::net::SocketAddr;
use std::time::Duration;

use bootstrap_admin::RegistrationClient;
use bootstrap_core::SharedSecret;
use bootstrap_gateway::{BootstrapGateway, GatewayConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const SECRET: &str = "test_shared_secret";

pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl TestGateway {
    /// Registration enabled with [`SECRET`] and default limits.
    pub async fn start() -> Self {
        Self::start_with(enabled_config()).await
    }

    pub async fn start_with(config: GatewayConfig) -> Self {
        let gateway = BootstrapGateway::new(config).expect("valid test config");
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let _ = gateway
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            addr,
            shutdown: Some(tx),
            server: Some(server),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> RegistrationClient {
        self.client_with_secret(SECRET)
    }

    pub fn client_with_secret(&self, secret: &str) -> RegistrationClient {
        RegistrationClient::new(self.url(), SharedSecret::new(secret).expect("non-empty secret"))
            .expect("client builds")
    }

    pub async fn metrics(&self) -> serde_json::Value {
        reqwest::get(format!("{}/metrics", self.url()))
            .await
            .expect("metrics reachable")
            .json()
            .await
            .expect("metrics json")
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
        }
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

pub fn enabled_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.registration.enabled = true;
    config.registration.shared_secret = Some(SECRET.to_string());
    config
}
