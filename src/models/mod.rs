pub mod loaders;
pub mod record;

pub use loaders::{load_all_record_files, load_record_file, save_record_file};
pub use record::{LabelSource, PromptRecord, RecordFile};
