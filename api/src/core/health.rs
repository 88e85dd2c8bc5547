//! Health reporting for `GET /health`.

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::{HealthStatus, LlmServiceProfiles};
use rag_store::{IndexHealth, RagStore};
use serde::Serialize;

/// Aggregated health snapshot. Degraded dependencies show up as `ok=false`
/// entries; building the report never fails.
#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    pub providers: Vec<HealthStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexHealth>,
    pub web_search: bool,
    pub timestamp: String,
}

impl HealthReport {
    pub fn new(providers: Vec<HealthStatus>, index: Option<IndexHealth>, web_search: bool) -> Self {
        let ok = providers.iter().all(|p| p.ok) && index.as_ref().is_none_or(|i| i.ok);
        Self {
            ok,
            providers,
            index,
            web_search,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

/// Health seam so handlers can be tested without network.
pub trait HealthReporter: Send + Sync {
    fn report(&self) -> Pin<Box<dyn Future<Output = HealthReport> + Send + '_>>;
}

/// Probes the chat/embedding providers and the vector index.
pub struct ServiceHealth {
    llm: Arc<LlmServiceProfiles>,
    store: Arc<RagStore>,
    web_search: bool,
}

impl ServiceHealth {
    pub fn new(llm: Arc<LlmServiceProfiles>, store: Arc<RagStore>, web_search: bool) -> Self {
        Self {
            llm,
            store,
            web_search,
        }
    }
}

impl HealthReporter for ServiceHealth {
    fn report(&self) -> Pin<Box<dyn Future<Output = HealthReport> + Send + '_>> {
        Box::pin(async move {
            let (providers, index) = futures::join!(self.llm.health_all(), self.store.health());
            HealthReport::new(providers, Some(index), self.web_search)
        })
    }
}
