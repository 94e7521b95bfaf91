//! Configuration module
//!
//! Handles CLI configuration and builds the orchestrator client from it.

use relay_client::HttpPipelineClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit orchestrator endpoint
    pub orchestrator_url: Option<String>,
    pub region: String,
    pub token: Option<String>,
}

impl Config {
    pub fn client(&self) -> HttpPipelineClient {
        let client = match &self.orchestrator_url {
            Some(url) => HttpPipelineClient::new(url.clone()),
            None => HttpPipelineClient::for_region(&self.region),
        };

        match &self.token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        }
    }
}
