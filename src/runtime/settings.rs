use crate::config;

/// Settle the loaded configuration, falling back to defaults on any problem.
///
/// Runs after logging is up so the fallback is visible.
pub fn settle(loaded: Result<config::Settings, ::config::ConfigError>) -> config::Settings {
    match loaded {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                tracing::warn!(%msg, "invalid config, using defaults");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent the daemon from starting.
            tracing::warn!(error = %e, "failed to load config, using defaults");
            config::Settings::default()
        }
    }
}
