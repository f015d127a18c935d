pub mod logging;
pub mod text;

pub use text::{generate_tags_auto, sanitize_label, truncate_text};
