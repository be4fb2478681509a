use crate::di::Scope;
use std::env;

pub const ENV_DEFAULT_SCOPE: &str = "BINDWIRE_DEFAULT_SCOPE";
pub const ENV_NON_LAZY: &str = "BINDWIRE_NON_LAZY";
pub const ENV_SIGNALS_REQUIRE_HANDLER: &str = "BINDWIRE_SIGNALS_REQUIRE_HANDLER";
pub const ENV_SIGNAL_STREAM_CAPACITY: &str = "BINDWIRE_SIGNAL_STREAM_CAPACITY";

/// Container-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSettings {
    /// Scope of bindings that do not choose one.
    pub default_scope: Scope,
    /// Instantiate non-lazy bindings as part of `build`.
    pub resolve_non_lazy_on_build: bool,
    /// Whether declared signals require a handler unless they say otherwise.
    pub signals_require_handler: bool,
    /// Buffer size of each signal's observer stream.
    pub signal_stream_capacity: usize,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            default_scope: Scope::Transient,
            resolve_non_lazy_on_build: true,
            signals_require_handler: false,
            signal_stream_capacity: 100,
        }
    }
}

impl ContainerSettings {
    /// Defaults overridden by `BINDWIRE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().merge_vars(env::vars())
    }

    /// Apply overrides from key/value pairs. Unknown keys are ignored and
    /// unparsable values are logged and skipped.
    pub fn merge_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                ENV_DEFAULT_SCOPE => match value.parse::<Scope>() {
                    Ok(scope) => self.default_scope = scope,
                    Err(_) => warn_ignored(key, value),
                },
                ENV_NON_LAZY => match parse_flag(value) {
                    Some(flag) => self.resolve_non_lazy_on_build = flag,
                    None => warn_ignored(key, value),
                },
                ENV_SIGNALS_REQUIRE_HANDLER => match parse_flag(value) {
                    Some(flag) => self.signals_require_handler = flag,
                    None => warn_ignored(key, value),
                },
                ENV_SIGNAL_STREAM_CAPACITY => match value.parse::<usize>() {
                    Ok(capacity) if capacity > 0 => self.signal_stream_capacity = capacity,
                    _ => warn_ignored(key, value),
                },
                _ => {}
            }
        }
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn warn_ignored(key: &str, value: &str) {
    tracing::warn!("Ignoring invalid value '{}' for {}", value, key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_vars_overrides_defaults() {
        let settings = ContainerSettings::default().merge_vars([
            (ENV_DEFAULT_SCOPE, "singleton"),
            (ENV_NON_LAZY, "off"),
            (ENV_SIGNALS_REQUIRE_HANDLER, "TRUE"),
            (ENV_SIGNAL_STREAM_CAPACITY, "8"),
            ("PATH", "/usr/bin"),
        ]);
        assert_eq!(settings.default_scope, Scope::Singleton);
        assert!(!settings.resolve_non_lazy_on_build);
        assert!(settings.signals_require_handler);
        assert_eq!(settings.signal_stream_capacity, 8);
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let settings = ContainerSettings::default().merge_vars([
            (ENV_DEFAULT_SCOPE, "forever"),
            (ENV_NON_LAZY, "maybe"),
            (ENV_SIGNAL_STREAM_CAPACITY, "0"),
        ]);
        assert_eq!(settings, ContainerSettings::default());
    }
}
