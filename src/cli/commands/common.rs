//! Helpers shared across CLI commands

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;

/// Output directory from `--data-dir`, falling back to the config file
pub fn resolve_data_dir(config: &Config, data_dir: Option<&Path>) -> PathBuf {
    data_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output.directory.clone())
}

/// Mask all but the ends of a secret for display
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Set up a Ctrl+C interrupt handler for graceful cancellation.
///
/// The returned flag flips to `true` on Ctrl+C. A collection run checks it
/// between categories, apps and review pages, so the files on disk stay
/// consistent when the run stops.
///
/// If a handler is already registered the new registration silently fails,
/// but the returned flag still works for direct use.
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = Arc::clone(&interrupted);

    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::SeqCst);
    })
    .ok(); // Ignore error if handler already set

    interrupted
}

/// Check if the interrupt flag has been set
#[inline]
pub fn is_interrupted(interrupted: &AtomicBool) -> bool {
    interrupted.load(Ordering::SeqCst)
}
