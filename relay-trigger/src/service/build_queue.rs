//! Build queue service
//!
//! The trigger never runs builds itself; it asks the build server to queue
//! one. Queueing goes through three steps mirroring the build server's own
//! model: a customizer collects parameters for a build configuration, the
//! customizer produces a promotion, and the promotion is added to the queue.

use async_trait::async_trait;
use relay_core::params::Params;
use relay_core::{RelayError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Entry point into the build server's queue
pub trait BuildBackend: Send + Sync {
    /// Starts customizing a build of the given build configuration
    fn create_customizer(&self, build_type_id: &str) -> Result<Box<dyn BuildCustomizer>>;
}

/// Collects parameters for one build before it is promoted
pub trait BuildCustomizer: Send {
    fn set_parameters(&mut self, params: Params);

    fn create_promotion(self: Box<Self>) -> Result<Box<dyn BuildPromotion>>;
}

/// A build ready to be queued
#[async_trait]
pub trait BuildPromotion: Send + Sync {
    fn id(&self) -> &str;

    /// Adds the build to the queue; `reason` is shown next to the queued build
    async fn add_to_queue(&self, reason: &str) -> Result<()>;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// Queues builds through the build server's REST API
#[derive(Debug, Clone)]
pub struct HttpBuildQueue {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpBuildQueue {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client: Client::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn queue_url(&self) -> String {
        format!("{}/app/rest/buildQueue", self.base_url)
    }
}

impl BuildBackend for HttpBuildQueue {
    fn create_customizer(&self, build_type_id: &str) -> Result<Box<dyn BuildCustomizer>> {
        if build_type_id.trim().is_empty() {
            return Err(RelayError::configuration("Build configuration id must not be empty"));
        }
        Ok(Box::new(HttpBuildCustomizer {
            queue: self.clone(),
            build_type_id: build_type_id.to_string(),
            params: Params::new(),
        }))
    }
}

struct HttpBuildCustomizer {
    queue: HttpBuildQueue,
    build_type_id: String,
    params: Params,
}

impl BuildCustomizer for HttpBuildCustomizer {
    fn set_parameters(&mut self, params: Params) {
        self.params = params;
    }

    fn create_promotion(self: Box<Self>) -> Result<Box<dyn BuildPromotion>> {
        let this = *self;
        Ok(Box::new(HttpBuildPromotion {
            id: Uuid::new_v4().to_string(),
            queue: this.queue,
            build_type_id: this.build_type_id,
            params: this.params,
        }))
    }
}

struct HttpBuildPromotion {
    id: String,
    queue: HttpBuildQueue,
    build_type_id: String,
    params: Params,
}

#[async_trait]
impl BuildPromotion for HttpBuildPromotion {
    fn id(&self) -> &str {
        &self.id
    }

    async fn add_to_queue(&self, reason: &str) -> Result<()> {
        let body = QueueBuildRequest::new(&self.build_type_id, reason, &self.params);

        let mut request = self
            .queue
            .client
            .post(self.queue.queue_url())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body);
        if let Some(token) = &self.queue.token {
            request = request.bearer_auth(token);
        }

        debug!("Queueing build of {} (promotion {})", self.build_type_id, self.id);
        let response = request
            .send()
            .await
            .map_err(|e| RelayError::transport(format!("Failed to queue build: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RelayError::transport_with_details(
                format!("Build server rejected the build of {}: {}", self.build_type_id, text),
                format!("status {}", status.as_u16()),
            ));
        }

        let queued: QueuedBuild = response
            .json()
            .await
            .map_err(|e| RelayError::protocol(format!("Unexpected build queue response: {}", e)))?;
        info!(
            "Build {} of {} queued (promotion {})",
            queued.id, self.build_type_id, self.id
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueBuildRequest {
    build_type: BuildTypeRef,
    comment: Comment,
    properties: Properties,
}

impl QueueBuildRequest {
    fn new(build_type_id: &str, reason: &str, params: &Params) -> Self {
        Self {
            build_type: BuildTypeRef {
                id: build_type_id.to_string(),
            },
            comment: Comment {
                text: reason.to_string(),
            },
            properties: Properties {
                property: params
                    .iter()
                    .map(|(name, value)| Property {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct BuildTypeRef {
    id: String,
}

#[derive(Debug, Serialize)]
struct Comment {
    text: String,
}

#[derive(Debug, Serialize)]
struct Properties {
    property: Vec<Property>,
}

#[derive(Debug, Serialize)]
struct Property {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct QueuedBuild {
    id: u64,
}

/// Backend that records queued builds instead of sending them
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub struct QueuedRequest {
        pub build_type_id: String,
        pub promotion_id: String,
        pub params: Params,
        pub reason: String,
    }

    #[derive(Clone, Default)]
    pub struct RecordingBackend {
        pub queued: Arc<Mutex<Vec<QueuedRequest>>>,
        pub fail_queueing: bool,
    }

    impl RecordingBackend {
        pub fn failing() -> Self {
            Self {
                fail_queueing: true,
                ..Self::default()
            }
        }

        pub fn queued(&self) -> Vec<QueuedRequest> {
            self.queued.lock().unwrap().clone()
        }
    }

    impl BuildBackend for RecordingBackend {
        fn create_customizer(&self, build_type_id: &str) -> Result<Box<dyn BuildCustomizer>> {
            Ok(Box::new(RecordingCustomizer {
                backend: self.clone(),
                build_type_id: build_type_id.to_string(),
                params: Params::new(),
            }))
        }
    }

    struct RecordingCustomizer {
        backend: RecordingBackend,
        build_type_id: String,
        params: Params,
    }

    impl BuildCustomizer for RecordingCustomizer {
        fn set_parameters(&mut self, params: Params) {
            self.params = params;
        }

        fn create_promotion(self: Box<Self>) -> Result<Box<dyn BuildPromotion>> {
            let n = self.backend.queued.lock().unwrap().len() + 1;
            Ok(Box::new(RecordingPromotion {
                id: format!("promotion-{}", n),
                customizer: *self,
            }))
        }
    }

    struct RecordingPromotion {
        id: String,
        customizer: RecordingCustomizer,
    }

    #[async_trait]
    impl BuildPromotion for RecordingPromotion {
        fn id(&self) -> &str {
            &self.id
        }

        async fn add_to_queue(&self, reason: &str) -> Result<()> {
            let backend = &self.customizer.backend;
            if backend.fail_queueing {
                return Err(RelayError::transport("Build queue is paused"));
            }
            backend.queued.lock().unwrap().push(QueuedRequest {
                build_type_id: self.customizer.build_type_id.clone(),
                promotion_id: self.id.clone(),
                params: self.customizer.params.clone(),
                reason: reason.to_string(),
            });
            Ok(())
        }
    }
}
