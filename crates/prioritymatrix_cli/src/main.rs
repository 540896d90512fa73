//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `prioritymatrix_core` linkage without the UI shell.
//! - Print the configured store's matrix counts in a stable format.

use prioritymatrix_core::{classify, CoreConfig, MatrixFilter, TaskStore};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("prioritymatrix_core ping={}", prioritymatrix_core::ping());
    println!(
        "prioritymatrix_core version={}",
        prioritymatrix_core::core_version()
    );

    let config = CoreConfig::from_env();
    if let Some(logging) = config.logging() {
        if let Err(err) = prioritymatrix_core::init_logging(&logging) {
            eprintln!("logging disabled: {err}");
        }
    }

    let tasks = match TaskStore::open(&config.db_path).and_then(|store| store.snapshot()) {
        Ok(tasks) => tasks,
        Err(err) => {
            eprintln!("cannot read {}: {err}", config.db_path.display());
            return ExitCode::FAILURE;
        }
    };

    let view = classify(&tasks, &MatrixFilter::default());
    println!("db_path={} total={}", config.db_path.display(), view.total());
    for (quadrant, bucket) in view.iter() {
        println!("quadrant={} count={}", quadrant.as_str(), bucket.len());
    }
    ExitCode::SUCCESS
}
