//! Configuration loaded from environment variables at startup.
//!
//! Centralizes all AIWATCH_* env var access into a single Config struct,
//! providing a single source of truth with fail-fast validation.

use std::path::PathBuf;
use std::sync::Mutex;

/// Global configuration instance, lazily initialized and resettable for tests.
static CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// Configuration loaded from AIWATCH_* environment variables.
///
/// All environment variable access should go through this struct
/// rather than calling env::var directly.
#[derive(Clone, Debug)]
pub struct Config {
    /// State directory (AIWATCH_DIR or ~/.aiwatch)
    pub aiwatch_dir: PathBuf,
    /// Directory to watch for source changes (AIWATCH_WATCH_DIR, overridden by --watch=)
    pub watch_dir: Option<String>,
    /// Adaptive output coalescing (AIWATCH_OUTPUT_THROTTLE, default true)
    pub output_throttle: bool,
    /// Enter-key remapping of user input (AIWATCH_INPUT_THROTTLE, default true)
    pub input_throttle: bool,
    /// Held-Enter burst detection (AIWATCH_HELD_ENTER, default false)
    pub held_enter: bool,
    /// Export TERM=xterm-256color to the child when unset (AIWATCH_FORCE_ANSI, default true)
    pub force_ansi: bool,
    /// Log level: debug, info, warn, error (AIWATCH_LOG_LEVEL, default info)
    pub log_level: String,
}

impl Config {
    /// Initialize global config from environment variables (call once at startup).
    /// Can be called multiple times - subsequent calls are no-ops.
    pub fn init() {
        let mut config = CONFIG.lock().unwrap();
        if config.is_none() {
            *config = Some(Self::from_env());
        }
    }

    /// Get a copy of the global config (must call init() first).
    /// Panics if init() was not called.
    pub fn get() -> Config {
        CONFIG
            .lock()
            .unwrap()
            .clone()
            .expect("Config::init() must be called before Config::get()")
    }

    /// Get a copy of the global config if initialized.
    ///
    /// Logging uses this so subsystems exercised before init (or from unit
    /// tests) degrade to a no-op instead of panicking.
    pub fn try_get() -> Option<Config> {
        CONFIG.lock().unwrap().clone()
    }

    /// Reset global config (test-only).
    /// Allows tests to reinitialize config with different env vars.
    #[cfg(test)]
    pub fn reset() {
        *CONFIG.lock().unwrap() = None;
    }

    /// Load configuration from environment variables
    fn from_env() -> Self {
        use std::env;

        // AIWATCH_DIR: custom state directory or ~/.aiwatch
        let aiwatch_dir = if let Ok(dir) = env::var("AIWATCH_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".aiwatch")
        } else {
            PathBuf::from(".aiwatch")
        };

        let watch_dir = env::var("AIWATCH_WATCH_DIR").ok().filter(|s| !s.is_empty());

        let output_throttle = env::var("AIWATCH_OUTPUT_THROTTLE")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        let input_throttle = env::var("AIWATCH_INPUT_THROTTLE")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        let held_enter = env::var("AIWATCH_HELD_ENTER")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let force_ansi = env::var("AIWATCH_FORCE_ANSI")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        let log_level = env::var("AIWATCH_LOG_LEVEL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "info".to_string());

        Self {
            aiwatch_dir,
            watch_dir,
            output_throttle,
            input_throttle,
            held_enter,
            force_ansi,
            log_level,
        }
    }
}

/// Parse a boolean env value: "true", "1", "yes", "on" are true (case-insensitive).
fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to set env var for test scope
    fn with_env<F>(key: &str, value: &str, f: F)
    where
        F: FnOnce(),
    {
        // SAFETY: Tests use serial_test to run single-threaded.
        // No data races possible when tests run serially.
        unsafe {
            env::set_var(key, value);
        }
        f();
        unsafe {
            env::remove_var(key);
        }
    }

    /// Helper to clear multiple env vars for test scope
    fn without_env<F>(keys: &[&str], f: F)
    where
        F: FnOnce(),
    {
        let saved: Vec<_> = keys.iter().map(|k| (k, env::var(k).ok())).collect();

        // SAFETY: Tests use serial_test to run single-threaded.
        // No data races possible when tests run serially.
        for key in keys {
            unsafe {
                env::remove_var(key);
            }
        }

        f();

        for (key, val) in saved {
            if let Some(v) = val {
                unsafe {
                    env::set_var(key, v);
                }
            }
        }
    }

    #[test]
    fn test_parse_bool_truthy_values() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("On"));
        assert!(parse_bool(" on "));
    }

    #[test]
    fn test_parse_bool_falsy_values() {
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("no"));
        assert!(!parse_bool("off"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("maybe"));
    }

    #[test]
    #[serial]
    fn test_default_config_uses_home_aiwatch() {
        Config::reset();
        without_env(&["AIWATCH_DIR"], || {
            Config::init();
            let config = Config::get();

            let expected = dirs::home_dir()
                .map(|h| h.join(".aiwatch"))
                .unwrap_or_else(|| PathBuf::from(".aiwatch"));
            assert_eq!(config.aiwatch_dir, expected);
        });
    }

    #[test]
    #[serial]
    fn test_aiwatch_dir_overrides_home() {
        Config::reset();
        with_env("AIWATCH_DIR", "/custom/aiwatch", || {
            Config::init();
            let config = Config::get();
            assert_eq!(config.aiwatch_dir, PathBuf::from("/custom/aiwatch"));
        });
    }

    #[test]
    #[serial]
    fn test_watch_dir_none_when_unset() {
        Config::reset();
        without_env(&["AIWATCH_WATCH_DIR"], || {
            Config::init();
            assert_eq!(Config::get().watch_dir, None);
        });
    }

    #[test]
    #[serial]
    fn test_watch_dir_some_when_set() {
        Config::reset();
        with_env("AIWATCH_WATCH_DIR", "/src/project", || {
            Config::init();
            assert_eq!(Config::get().watch_dir, Some("/src/project".to_string()));
        });
    }

    #[test]
    #[serial]
    fn test_output_throttle_defaults_on() {
        Config::reset();
        without_env(&["AIWATCH_OUTPUT_THROTTLE"], || {
            Config::init();
            assert!(Config::get().output_throttle);
        });
    }

    #[test]
    #[serial]
    fn test_output_throttle_disabled() {
        Config::reset();
        with_env("AIWATCH_OUTPUT_THROTTLE", "off", || {
            Config::init();
            assert!(!Config::get().output_throttle);
        });
    }

    #[test]
    #[serial]
    fn test_held_enter_defaults_off() {
        Config::reset();
        without_env(&["AIWATCH_HELD_ENTER"], || {
            Config::init();
            assert!(!Config::get().held_enter);
        });
    }

    #[test]
    #[serial]
    fn test_held_enter_enabled() {
        Config::reset();
        with_env("AIWATCH_HELD_ENTER", "1", || {
            Config::init();
            assert!(Config::get().held_enter);
        });
    }

    #[test]
    #[serial]
    fn test_log_level_default_info() {
        Config::reset();
        without_env(&["AIWATCH_LOG_LEVEL"], || {
            Config::init();
            assert_eq!(Config::get().log_level, "info");
        });
    }

    #[test]
    #[serial]
    fn test_log_level_respects_env_var() {
        Config::reset();
        with_env("AIWATCH_LOG_LEVEL", "debug", || {
            Config::init();
            assert_eq!(Config::get().log_level, "debug");
        });
    }

    #[test]
    #[serial]
    fn test_reset_allows_reinit() {
        Config::reset();
        with_env("AIWATCH_LOG_LEVEL", "warn", || {
            Config::init();
            assert_eq!(Config::get().log_level, "warn");
        });

        Config::reset();
        with_env("AIWATCH_LOG_LEVEL", "error", || {
            Config::init();
            assert_eq!(Config::get().log_level, "error");
        });
    }
}
