//! `repomake`: reads a repository's declarative `BUILD` files and emits a
//! single self-contained Makefile driving compilation, test, install and
//! clean across C, C++, Java, Python, Go and shell targets.
//!
//! The build graph engine (node data model, dependency resolution,
//! artifact/flag propagation, ordered Makefile emission) lives in
//! [`node`], [`parser`] and [`generator`]; everything else in this crate
//! is the ambient stack (CLI, logging, errors, the on-disk build-file
//! reader, the manifest cache) that makes it a runnable tool.

pub mod buildfile;
pub mod cache;
pub mod cli;
pub mod dist;
pub mod errors;
pub mod generator;
pub mod input;
pub mod logger;
pub mod makefile;
pub mod node;
pub mod output;
pub mod parser;
pub mod registry;
pub mod resource;
pub mod unwrap_or_terminate;
pub mod utility;

pub use errors::{Error, Result};

#[cfg(test)]
pub(crate) mod tests {
    lazy_static::lazy_static! {
        static ref ENV_LOCK_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    }

    /// Guards environment-variable mutation across concurrently-run unit
    /// tests (e.g. `buildfile`'s `${env:VAR}` substitution). The only
    /// process-wide lock in the crate; not a production concern.
    pub struct EnvLock<'env> {
        _mutex_guard: std::sync::MutexGuard<'env, ()>,
        env_var: String,
        old_env_value: Option<String>,
    }

    impl<'env> EnvLock<'env> {
        pub fn lock(env_var: &str, new_value: &str) -> Self {
            let mutex_guard = ENV_LOCK_MUTEX.lock().unwrap();
            let old_env_value = std::env::var(env_var).ok();
            std::env::set_var(env_var, new_value);
            Self {
                _mutex_guard: mutex_guard,
                env_var: env_var.to_string(),
                old_env_value,
            }
        }
    }

    impl<'env> Drop for EnvLock<'env> {
        fn drop(&mut self) {
            match &self.old_env_value {
                Some(old) => std::env::set_var(&self.env_var, old),
                None => std::env::remove_var(&self.env_var),
            }
        }
    }
}
