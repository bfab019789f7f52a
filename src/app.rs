//! Process-level wiring: configuration, database, event bus, and the media
//! service built from them.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use mv_av::ToolRegistry;
use mv_core::config::Config;
use mv_core::events::{EventBus, TOPIC_CONVERTED};
use mv_core::{EventPublisher, FileId, RecordStore};
use mv_db::models::FileRecord;
use mv_db::pool::{get_conn, init_pool, DbPool};
use mv_db::queries::files;
use mv_db::SqliteRecordStore;
use mv_ingest::MediaService;

pub struct App {
    pub config: Config,
    pub db: DbPool,
    pub events: Arc<EventBus>,
}

impl App {
    /// Load config and open (or create) the database.
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path);
        for warning in config.validate() {
            tracing::warn!("config: {warning}");
        }

        if let Some(parent) = config.storage.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {}", parent.display()))?;
            }
        }

        let db_path = config.storage.db_path.to_string_lossy().into_owned();
        tracing::debug!("Opening database at {db_path}");
        let db = init_pool(&db_path).with_context(|| format!("opening database {db_path}"))?;

        Ok(Self {
            config,
            db,
            events: Arc::new(EventBus::default()),
        })
    }

    /// Build a media service writing through this app's database and bus.
    pub fn service(&self) -> Result<MediaService> {
        let tools = ToolRegistry::discover(&self.config.tools);
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(self.db.clone()));
        let publisher: Arc<dyn EventPublisher> = self.events.clone();

        MediaService::from_config(&self.config, &tools, store, Some(publisher))
            .context("external tools unavailable; run `mediavault check-tools`")
    }

    /// Look up a file by its textual ID.
    pub fn file(&self, id: &str) -> Result<FileRecord> {
        let id: FileId = id.parse().with_context(|| format!("invalid file id: {id}"))?;
        let conn = get_conn(&self.db)?;
        files::get_file(&conn, id)?.ok_or_else(|| anyhow::anyhow!("file not found: {id}"))
    }

    /// Print every conversion event published during this run, oldest first.
    pub fn print_converted_events(&self) {
        for event in self.events.recent_events(100).iter().rev() {
            if event.topic == TOPIC_CONVERTED {
                println!("  event {}: {}", event.topic, event.payload);
            }
        }
    }
}
