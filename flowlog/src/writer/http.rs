//! HTTP writer posting documents to an index endpoint.

use super::DocumentWriter;
use crate::config::RunConfiguration;
use crate::core::Document;
use crate::errors::{FlowlogError, Result};
use async_trait::async_trait;
use openssl::pkcs12::Pkcs12;
use reqwest::{Certificate, Client, Url};
use tracing::debug;

/// Posts each document as a JSON body to one endpoint.
pub struct HttpDocumentWriter {
    client: Client,
    uri: Url,
    username: Option<String>,
    password: Option<String>,
}

impl std::fmt::Debug for HttpDocumentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDocumentWriter")
            .field("uri", &self.uri.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl HttpDocumentWriter {
    /// Builds a writer for the run's endpoint, credentials and trust material.
    pub fn new(config: &RunConfiguration) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.timeout());
        if let Some(trust_store) = config.trust_store() {
            for certificate in trust_certificates(trust_store)? {
                builder = builder.add_root_certificate(certificate);
            }
        }
        let client = builder
            .build()
            .map_err(|e| FlowlogError::configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            uri: config.uri().clone(),
            username: config.username().map(String::from),
            password: config.password().map(String::from),
        })
    }

    /// The endpoint documents are posted to.
    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }
}

#[async_trait]
impl DocumentWriter for HttpDocumentWriter {
    async fn push(&self, document: &Document) -> Result<()> {
        let mut request = self.client.post(self.uri.clone()).json(document);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlowlogError::delivery(format!(
                "backend rejected document with HTTP {status}: {body}"
            )));
        }

        debug!(uri = %self.uri, status = %status, "Document delivered");
        Ok(())
    }
}

/// Extracts the certificates of a PKCS#12 trust store with an empty password.
pub fn trust_certificates(pkcs12: &[u8]) -> Result<Vec<Certificate>> {
    let parsed = Pkcs12::from_der(pkcs12)
        .and_then(|store| store.parse2(""))
        .map_err(|e| FlowlogError::configuration(format!("unreadable trust store: {e}")))?;

    let mut certificates = Vec::new();
    certificates.extend(parsed.cert);
    if let Some(chain) = parsed.ca {
        certificates.extend(chain);
    }
    if certificates.is_empty() {
        return Err(FlowlogError::configuration(
            "trust store contains no certificates",
        ));
    }

    certificates
        .iter()
        .map(|cert| {
            let der = cert
                .to_der()
                .map_err(|e| FlowlogError::configuration(format!("bad certificate: {e}")))?;
            Certificate::from_der(&der)
                .map_err(|e| FlowlogError::configuration(format!("bad certificate: {e}")))
        })
        .collect()
}
