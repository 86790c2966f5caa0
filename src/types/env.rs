//! Environment access
//!
//! Everything that reads configuration from the environment goes through
//! [`EnvSource`], so the checks built on it can be exercised with a plain map.

use std::collections::HashMap;

/// A read-only view of environment variables
pub trait EnvSource {
    /// Get the raw value of a variable, if set
    fn var(&self, key: &str) -> Option<String>;

    /// Get a variable only when it is set to something other than whitespace
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).filter(|value| !value.trim().is_empty())
    }
}

/// The environment of the running process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_env_source() {
        let mut env = HashMap::new();
        env.insert("SET".to_string(), "value".to_string());
        env.insert("BLANK".to_string(), "   ".to_string());

        assert_eq!(env.var("SET").as_deref(), Some("value"));
        assert_eq!(env.var("MISSING"), None);
        assert_eq!(env.var("BLANK").as_deref(), Some("   "));
        assert_eq!(env.non_empty("BLANK"), None);
    }
}
