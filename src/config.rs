use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves a path relative to the config directory.
fn config_path(sub: &str) -> PathBuf {
    let base = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
    Path::new(&base).join(sub)
}

/// Initialize config directory with a default roster if missing.
pub fn init() {
    let base = config_path("");
    if !base.exists() {
        fs::create_dir_all(&base).expect("Failed to create config directory");
    }

    let users_path = config_path("users.json");
    if !users_path.exists() {
        let default_users = serde_json::json!({
            "1234": "Alice",
            "5678": "Bob",
        });
        fs::write(
            &users_path,
            serde_json::to_string_pretty(&default_users).unwrap(),
        )
        .expect("Failed to write default users.json");
    }
}

/// Load the PIN -> display name credential store. Entries that are not
/// 4-digit numeric PINs are skipped with a warning.
pub fn load_credentials() -> HashMap<String, String> {
    let path = config_path("users.json");
    let data = fs::read_to_string(&path).expect("Failed to read users.json");
    let raw: HashMap<String, String> =
        serde_json::from_str(&data).expect("Failed to parse users.json");

    let mut credentials = HashMap::new();
    for (pin, name) in raw {
        if pin.len() == 4 && pin.chars().all(|c| c.is_ascii_digit()) {
            credentials.insert(pin, name);
        } else {
            tracing::warn!("Skipping invalid PIN entry: {}", pin);
        }
    }
    credentials
}
