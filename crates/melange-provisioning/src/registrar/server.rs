use super::build_client;
use crate::{
    errors::*,
    traits::ServerRegistrar,
    types::{Attributes, EndpointDescriptor},
    wire::{RegistrationReceipt, ServerRegistrationMessage},
};
use async_trait::async_trait;
use melange_crypto::Identity;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Registers identities with a key server over HTTP
#[derive(Clone)]
pub struct HttpServerRegistrar {
    client: Client,
}

impl HttpServerRegistrar {
    /// Client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl ServerRegistrar for HttpServerRegistrar {
    async fn register(
        &self,
        identity: &Identity,
        server: &EndpointDescriptor,
        attributes: &Attributes,
    ) -> Result<()> {
        let message = ServerRegistrationMessage::build(identity, server, attributes)
            .map_err(|e| ProvisioningError::ServerRegistration(e.to_string()))?;

        let response = self
            .client
            .post(format!("{}/v1/register", server.url))
            .json(&message)
            .send()
            .await
            .map_err(|e| ProvisioningError::ServerRegistration(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(server = %server.reference, %status, "Server refused registration");
            return Err(ProvisioningError::ServerRegistration(format!(
                "server returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let receipt: RegistrationReceipt = response.json().await.map_err(|e| {
            ProvisioningError::ServerRegistration(format!("malformed response: {}", e))
        })?;

        if receipt.address != identity.address() {
            return Err(ProvisioningError::ServerRegistration(
                "receipt names a different address".to_string(),
            ));
        }

        debug!(
            server = %server.reference,
            address = %identity.address(),
            "Registered with server"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registrar::DEFAULT_TIMEOUT;
    use crate::registrar::test_support::spawn;
    use crate::types::EndpointKind;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use melange_crypto::{derive_fingerprint, X25519KeyPair};
    use std::sync::Arc;

    fn endpoint(url: String, key: &X25519KeyPair) -> EndpointDescriptor {
        let encryption_key = key.public_key_bytes();
        EndpointDescriptor {
            kind: EndpointKind::Server,
            reference: "srv1".to_string(),
            url,
            encryption_key,
            fingerprint: derive_fingerprint(&encryption_key),
        }
    }

    fn name_only() -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("name".to_string(), b"Ada Lovelace".to_vec());
        attributes
    }

    fn registrar() -> HttpServerRegistrar {
        HttpServerRegistrar::new(DEFAULT_TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn test_register_accepted() {
        let server_key = Arc::new(X25519KeyPair::from_seed(&[3u8; 32]));
        let key = Arc::clone(&server_key);
        let router = Router::new().route(
            "/v1/register",
            post(move |Json(message): Json<ServerRegistrationMessage>| {
                let key = Arc::clone(&key);
                async move {
                    match message.open(&key) {
                        Ok(attributes) if attributes.contains_key("name") => Ok(Json(
                            RegistrationReceipt {
                                address: message.address,
                            },
                        )),
                        _ => Err(StatusCode::UNAUTHORIZED),
                    }
                }
            }),
        );
        let url = spawn(router).await;

        let identity = Identity::generate().unwrap();
        let registrar = registrar();
        registrar
            .register(&identity, &endpoint(url, &server_key), &name_only())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_refused() {
        let server_key = X25519KeyPair::from_seed(&[3u8; 32]);
        let router = Router::new().route(
            "/v1/register",
            post(|| async { (StatusCode::BAD_REQUEST, "no") }),
        );
        let url = spawn(router).await;

        let identity = Identity::generate().unwrap();
        let result = registrar()
            .register(&identity, &endpoint(url, &server_key), &name_only())
            .await;

        assert!(matches!(result, Err(ProvisioningError::ServerRegistration(_))));
    }

    #[tokio::test]
    async fn test_malformed_receipt() {
        let server_key = X25519KeyPair::from_seed(&[3u8; 32]);
        let router = Router::new().route("/v1/register", post(|| async { "not json" }));
        let url = spawn(router).await;

        let identity = Identity::generate().unwrap();
        let result = registrar()
            .register(&identity, &endpoint(url, &server_key), &name_only())
            .await;

        assert!(matches!(result, Err(ProvisioningError::ServerRegistration(_))));
    }

    #[tokio::test]
    async fn test_slow_server_hits_timeout() {
        let server_key = X25519KeyPair::from_seed(&[3u8; 32]);
        let router = Router::new().route(
            "/v1/register",
            post(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(10)).await;
                StatusCode::OK
            }),
        );
        let url = spawn(router).await;

        let identity = Identity::generate().unwrap();
        let started = std::time::Instant::now();
        let result = HttpServerRegistrar::new(Duration::from_millis(200))
            .unwrap()
            .register(&identity, &endpoint(url, &server_key), &name_only())
            .await;

        assert!(matches!(result, Err(ProvisioningError::ServerRegistration(_))));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}
