pub mod catalog;
pub mod enums;
pub mod instance;
pub mod template;
pub mod timeline;
pub mod views;

pub use catalog::{RewardPoint, TaskTypeCatalog};
pub use enums::{all_weekdays, parse_weekdays, RewardType, TaskStatus, TaskType};
pub use instance::TaskInstance;
pub use template::TaskTemplate;
pub use timeline::{check_placement, generate_day, is_slot_available, SlotError};
pub use views::{format_duration, format_time_of_day, parse_time_of_day, timeline_row};
