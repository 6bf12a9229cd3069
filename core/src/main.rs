//! Cipher Scribe Node
//!
//! Hosts the encrypted peer-review ledger behind an HTTP API.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      Cipher Scribe Node                       │
//! │                                                               │
//! │  ┌─────────────┐   ┌──────────────────┐   ┌───────────────┐   │
//! │  │  HTTP API   │──▶│  LedgerService   │──▶│    Ledger     │   │
//! │  │   (axum)    │   │ (single writer)  │   │ registry      │   │
//! │  └──────┬──────┘   └──────────────────┘   │ scores        │   │
//! │         │ reads, SSE                      │ disclosure    │   │
//! │         └────────────────────────────────▶└───────┬───────┘   │
//! │                                                   │           │
//! │                    ┌──────────────────┐   ┌───────▼───────┐   │
//! │                    │ Mock coprocessor │◀──│   RocksDB     │   │
//! │                    │  (ciphertexts)   │   │   (state)     │   │
//! │                    └──────────────────┘   └───────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio::signal;

use scribe_config::ScribeConfig;
use scribe_core::api::create_router;
use scribe_core::api::handlers::ApiState;
use scribe_core::config::ledger_config;
use scribe_core::ledger::{Ledger, LedgerService, SystemClock};
use scribe_core::storage::{LedgerStore, MemoryStore, RocksDbStore};
use scribe_fhe::{EncryptedValueService, MemoryTable, MockCoprocessor};
use scribe_paper::PROTOCOL_ID;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let loaded = ScribeConfig::load().context("failed to load configuration")?;
    if ScribeConfig::set_global(loaded).is_err() {
        warn!("Global config was already initialized");
    }
    let config = ScribeConfig::global();
    let ledger_settings = ledger_config(&config)?;

    info!("============================================");
    info!(
        "        CIPHER SCRIBE NODE v{}            ",
        env!("CARGO_PKG_VERSION")
    );
    info!("============================================");
    info!("Protocol id       : {}", PROTOCOL_ID);
    if config.database.in_memory {
        info!("Database          : in-memory");
    } else {
        info!("DB path           : {}", config.database.path);
    }
    info!("API               : {}:{}", config.api.host, config.api.port);
    info!("Owner             : {}", ledger_settings.owner.short());
    info!("Final score to    : {:?}", ledger_settings.disclosure.final_score);
    info!("Share total to    : {:?}", ledger_settings.disclosure.share_total);
    info!("Dev mode          : {}", config.features.dev_mode);
    info!("============================================");

    let seed = config.relayer.coprocessor_seed.as_str();
    let store: Arc<dyn LedgerStore>;
    let fhe: Arc<dyn EncryptedValueService>;
    if config.database.in_memory {
        warn!("In-memory database: state is lost on exit");
        store = Arc::new(MemoryStore::new());
        fhe = Arc::new(MockCoprocessor::new(seed, MemoryTable::new()));
    } else {
        let db = RocksDbStore::open(&config.database.path)
            .with_context(|| format!("failed to open RocksDB at {}", config.database.path))?;
        info!("Database opened at {}", config.database.path);
        fhe = Arc::new(MockCoprocessor::new(seed, db.clone()));
        store = Arc::new(db);
    }

    let ledger = Ledger::open(
        store,
        fhe.clone(),
        Arc::new(SystemClock),
        ledger_settings,
    )?;
    info!(
        "Ledger opened: {} papers registered",
        ledger.registry.count()?
    );

    let service = Arc::new(LedgerService::start(Arc::new(ledger)));
    info!("Ledger service started");

    let api_state = ApiState {
        service: service.clone(),
        fhe,
        dev_mode: config.features.dev_mode,
        start_time: std::time::Instant::now(),
    };

    let router = create_router(api_state);
    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port)
        .parse()
        .context("invalid API address")?;
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP API listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("HTTP server error: {}", e);
        }
    });

    info!("============================================");
    info!("  Cipher Scribe node is ready!");
    info!("  API: http://{}", addr);
    info!("============================================");

    signal::ctrl_c().await?;
    info!("Shutdown signal received");

    info!("Shutting down ledger service...");
    if let Err(e) = service.shutdown().await {
        error!("Error shutting down ledger service: {}", e);
    }

    info!("Cipher Scribe node stopped");
    Ok(())
}
