pub mod catalog;
pub mod config;
pub mod library;
pub mod matching;
pub mod metrics;
pub mod reconcile;
pub mod scheduler;
pub mod testing;

pub use catalog::{
    CatalogCandidate, CatalogDetails, CatalogError, CatalogId, CatalogService, ListStatus,
    MalClient, MalConfig, TrackingUpdate,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use library::{
    EntryKey, JsonBackupStore, LibraryEntry, LibraryError, LibraryStore, SourceId,
    TrackingRecord, MYANIMELIST_SOURCE,
};
pub use matching::{MatchResult, MatchVerdict, MatchWorker};
pub use reconcile::{
    ChannelListener, ItemId, MatchStatus, NoopListener, ReconcileConfig, ReconcileError,
    ReconciliationSession, SessionEvent, SessionListener, SessionOutcome, WorkItem,
};
pub use scheduler::{BatchPolicy, BatchProgress, BatchScheduler, RunSummary, ShutdownSignal};
