use std::sync::Arc;

use ai_llm_service::{
    LlmServiceProfiles,
    config::default_config::{config_chat_from_env, config_embedding_from_env},
    error_handler::{env_or, must_env},
    telemetry,
};
use anyhow::Context;
use api::{ApiConfig, AppState, ServiceHealth, refresh_secret_from_env};
use contextor::{Contextor, ContextorConfig};
use rag_store::{DEFAULT_INDEX, DEFAULT_NAMESPACE, IngestOptions, LlmEmbedder, RagConfig, RagStore};
use tracing::{info, warn};
use web_search::{ExaClient, ExaConfig};

fn rag_config_from_env() -> anyhow::Result<RagConfig> {
    let mut cfg = RagConfig::new_default(
        must_env("PINECONE_INDEX_HOST")?,
        must_env("PINECONE_API_KEY")?,
    );
    cfg.index_name = env_or("PINECONE_INDEX", DEFAULT_INDEX);
    cfg.namespace = env_or("PINECONE_NAMESPACE", DEFAULT_NAMESPACE);
    cfg.embedding_dim = match std::env::var("EMBEDDING_DIM") {
        Ok(v) if !v.trim().is_empty() => Some(
            v.trim()
                .parse()
                .with_context(|| format!("EMBEDDING_DIM must be a positive integer, got {v:?}"))?,
        ),
        _ => None,
    };
    Ok(cfg)
}

/// Web search is optional: without a key the assistant answers from the
/// index only and `/index/refresh` reports 503.
fn web_search_from_env() -> anyhow::Result<Option<ExaClient>> {
    let key_missing = std::env::var("EXA_API_KEY").map_or(true, |v| v.trim().is_empty());
    if key_missing {
        warn!("EXA_API_KEY is not set; web fallback and index refresh are off");
        return Ok(None);
    }
    let cfg = ExaConfig::from_env().context("invalid web search configuration")?;
    Ok(Some(ExaClient::new(&cfg)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the process environment is used as is.
    let dotenv = dotenvy::dotenv();

    telemetry::init("info").context("failed to install tracing subscriber")?;
    if let Err(e) = dotenv {
        info!(error = %e, "no .env loaded");
    }

    let llm = Arc::new(
        LlmServiceProfiles::new(config_chat_from_env()?, config_embedding_from_env()?, None)
            .context("failed to build LLM clients")?,
    );

    let rag_cfg = rag_config_from_env()?;
    let expected_dim = rag_cfg.embedding_dim;
    let ingest = IngestOptions::from(&rag_cfg);
    let store = Arc::new(RagStore::new(rag_cfg).context("failed to build vector index client")?);
    let embedder = Arc::new(LlmEmbedder::new(llm.clone(), expected_dim));

    let cfg = ContextorConfig::from_env().context("invalid retrieval configuration")?;
    let mut contextor =
        Contextor::new(embedder, store.clone(), llm.clone(), cfg).with_ingest_options(ingest);
    let search = web_search_from_env()?;
    let web_search = search.is_some();
    if let Some(client) = search {
        contextor = contextor.with_search(Arc::new(client));
    }

    let state = Arc::new(AppState {
        contextor: Arc::new(contextor),
        health: Arc::new(ServiceHealth::new(llm, store, web_search)),
        refresh_secret: refresh_secret_from_env(),
    });

    let api_cfg = ApiConfig::from_env();
    info!(
        address = %api_cfg.address,
        web_search,
        refresh = state.refresh_secret.is_some(),
        "starting aven chat backend"
    );
    api::start(state, api_cfg).await?;

    Ok(())
}
