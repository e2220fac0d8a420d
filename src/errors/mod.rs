use std::path::Path;

/// Context line for a failed page fetch
pub fn fetch_context(url: &str) -> String {
    format!("Failed to fetch from: {}", url)
}

/// Context line for a failed store operation
pub fn store_context(operation: &str, path: &Path) -> String {
    format!("Failed to {} store {}", operation, path.display())
}
