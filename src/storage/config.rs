use std::path::Path;

use reelrelay_core::models::settings::RelaySettings;

pub const CONFIG_PATH_VAR: &str = "RELAY_CONFIG";

pub fn load_settings() -> RelaySettings {
    load_settings_from(|key| std::env::var(key).ok())
}

/// Settings file first (if `RELAY_CONFIG` names one), then environment overrides.
pub fn load_settings_from(env: impl Fn(&str) -> Option<String>) -> RelaySettings {
    let mut settings = match env(CONFIG_PATH_VAR) {
        Some(path) if !path.trim().is_empty() => read_settings_file(Path::new(path.trim())),
        _ => RelaySettings::default(),
    };
    apply_env_overrides(&mut settings, &env);
    settings
}

fn read_settings_file(path: &Path) -> RelaySettings {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Could not read {}: {}; using defaults", path.display(), e);
            return RelaySettings::default();
        }
    };

    match serde_json::from_str::<RelaySettings>(&raw) {
        Ok(settings) => {
            tracing::info!("Loaded settings from {}", path.display());
            settings
        }
        Err(e) => {
            tracing::warn!("Invalid settings in {}: {}; using defaults", path.display(), e);
            RelaySettings::default()
        }
    }
}

fn apply_env_overrides(settings: &mut RelaySettings, env: &impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(host) = non_empty("HOST") {
        settings.server.host = host;
    }

    if let Some(port) = non_empty("PORT") {
        match port.parse::<u16>() {
            Ok(p) => settings.server.port = p,
            Err(_) => tracing::warn!("Ignoring invalid PORT {:?}", port),
        }
    }

    if let Some(origins) = non_empty("ALLOWED_ORIGINS") {
        settings.cors.allowed_origins = origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty() && o != "*")
            .collect();
    }

    if let Some(base) = non_empty("TIKTOK_API_BASE") {
        settings.upstream.tiktok_api_base = base;
    }
}
