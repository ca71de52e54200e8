pub mod atomic;
pub mod environment;
pub mod terminal;
pub mod timestamps;

pub use atomic::{write_atomic, write_json_atomic};
pub use environment::{app_cache_dir, get_config_dir, get_data_dir};
pub use terminal::{sanitize_for_display, strip_ansi_codes};
pub use timestamps::format_timestamp;
