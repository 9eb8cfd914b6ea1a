use reqwest::Client;
use std::future::Future;
use std::time::Duration;

use super::FetchError;

pub const DEFAULT_STRUCTURE_BASE_URL: &str = "https://files.rcsb.org/view";

/// Anything that can produce PDB text for a structure identifier
pub trait StructureSource {
    fn fetch(&self, structure_id: &str)
        -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Public structure archive client: `GET {base_url}/{id}.pdb`
#[derive(Debug, Clone)]
pub struct RcsbClient {
    client: Client,
    base_url: String,
}

impl RcsbClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("structure client without timeout: {}", e);
                Client::new()
            });
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, structure_id: &str) -> String {
        format!("{}/{}.pdb", self.base_url, structure_id)
    }
}

impl Default for RcsbClient {
    fn default() -> Self {
        Self::new(DEFAULT_STRUCTURE_BASE_URL)
    }
}

/// Identifiers are passed into a URL path, so only plain alphanumerics
pub fn validate_id(structure_id: &str) -> Result<&str, FetchError> {
    let id = structure_id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FetchError::InvalidId(structure_id.to_string()));
    }
    Ok(id)
}

impl StructureSource for RcsbClient {
    fn fetch(
        &self,
        structure_id: &str,
    ) -> impl Future<Output = Result<String, FetchError>> + Send {
        let request = validate_id(structure_id).map(|id| (id.to_string(), self.url_for(id)));
        let client = self.client.clone();

        async move {
            let (id, url) = request?;
            tracing::debug!("fetching structure {} from {}", id, url);

            let response = client.get(&url).send().await.map_err(|e| FetchError::Network {
                id: id.clone(),
                message: e.to_string(),
            })?;

            if !response.status().is_success() {
                return Err(FetchError::Status {
                    id,
                    status: response.status().as_u16(),
                });
            }

            response.text().await.map_err(|e| FetchError::Network {
                id,
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_archive_url() {
        let client = RcsbClient::new("https://files.rcsb.org/view/");
        assert_eq!(client.url_for("1TUP"), "https://files.rcsb.org/view/1TUP.pdb");
    }

    #[test]
    fn rejects_path_like_ids() {
        assert!(validate_id("1TUP").is_ok());
        assert_eq!(validate_id(" 6M0J ").ok(), Some("6M0J"));
        assert!(matches!(validate_id("../etc"), Err(FetchError::InvalidId(_))));
        assert!(matches!(validate_id(""), Err(FetchError::InvalidId(_))));
    }

    /// Serve one canned HTTP response on a local port
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn not_found_becomes_status_error() {
        let base = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let client = RcsbClient::new(&base);

        let result = client.fetch("9ZZZ").await;
        assert_eq!(
            result,
            Err(FetchError::Status {
                id: "9ZZZ".to_string(),
                status: 404
            })
        );
    }

    #[tokio::test]
    async fn success_returns_body_text() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 12\r\nConnection: close\r\n\r\nHEADER 1TUP\n",
        )
        .await;
        let client = RcsbClient::new(&base);
        assert_eq!(client.fetch("1TUP").await.as_deref(), Ok("HEADER 1TUP\n"));
    }

    #[tokio::test]
    async fn invalid_id_fails_without_network() {
        let client = RcsbClient::new("http://127.0.0.1:9");
        let result = client.fetch("not an id").await;
        assert!(matches!(result, Err(FetchError::InvalidId(_))));
    }
}
