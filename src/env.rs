use crate::alias::AliasStore;
use crate::config::ShellConfig;
use crate::jobs::JobRegistry;
use std::collections::HashMap;
use std::env as stdenv;
use std::sync::Arc;

/// Mutable interpreter state shared by all commands.
///
/// The environment contains:
/// - `vars`: variables consulted by the shell itself (only `PATH` is used).
/// - `aliases`: the alias table, owned by the interpreter thread.
/// - `jobs`: the background job table, shared with the signal handlers.
/// - `should_exit`: set by `exit`; the read loop stops when it sees it.
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub aliases: AliasStore,
    pub jobs: Arc<JobRegistry>,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the process environment and allocate tables sized by `config`.
    pub fn new(config: &ShellConfig) -> Self {
        Self::with_vars(config, stdenv::vars().collect())
    }

    /// Like [`Environment::new`], with an explicit variable set.
    pub fn with_vars(config: &ShellConfig, vars: HashMap<String, String>) -> Self {
        Self {
            vars,
            aliases: AliasStore::new(config.alias_capacity),
            jobs: Arc::new(JobRegistry::new(config.job_capacity)),
            should_exit: false,
        }
    }

    /// Get the value of a variable. Unset variables stay unset; the process
    /// environment is only read once, at construction.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_uses_only_given_vars() {
        let env = Environment::with_vars(&ShellConfig::default(), HashMap::new());
        assert_eq!(env.get_var("PATH"), None);

        let vars = HashMap::from([("PATH".to_string(), "/a:/b".to_string())]);
        let env = Environment::with_vars(&ShellConfig::default(), vars);
        assert_eq!(env.get_var("PATH"), Some("/a:/b"));
        assert_eq!(env.get_var("HOME"), None);
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new(&ShellConfig::default());
        assert!(env.get_var("PATH").is_some());
        assert!(env.aliases.is_empty());
        assert!(!env.jobs.has_active());
        assert!(!env.should_exit);
    }
}
