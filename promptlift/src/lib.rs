// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;
pub mod translate;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    FileOutcome, ProgressCallback, collect_png_files, is_png_path, process_files, render_raw,
    render_results, render_summary,
};

pub use translate::{
    Capabilities, TranslateError, TranslationDirection, Translator, TranslatorEngine,
    translate_all,
};
