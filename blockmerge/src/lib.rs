#[path = "handlers.rs"]
pub mod handlers;
pub mod logging;

pub use handlers::{
    RunInputs, RunResult, RunSettings, load_run_inputs, normalize_whitelist_file, run_pipeline,
};
