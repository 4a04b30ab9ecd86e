pub mod files;
pub mod history;
pub mod migration;
pub mod store;

pub use files::{
    atomic_write, config_file, ensure_data_dir, get_data_dir, init_local_data_dir, report_file,
    save_file,
};
pub use history::{TaskStatusHistory, TaskStatusRecord};
pub use migration::{decode_templates, TemplatesBlob};
pub use store::{JsonFileStore, MemoryStore, SaveStore, SaveStoreExt};

/// Key for the user's task templates
pub const TEMPLATES_SAVE_KEY: &str = "TaskTemplatesData";
/// Key for the per-date status history
pub const STATUS_SAVE_KEY: &str = "TaskStatusHistory";
/// Key for player stats
pub const PLAYER_STATS_SAVE_KEY: &str = "PlayerStats";
