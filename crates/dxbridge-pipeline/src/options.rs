//! Pipeline manager configuration.
//!
//! Defaults can be overridden through environment variables, which is mostly useful to
//! debug driver issues without rebuilding:
//! - `DXBRIDGE_MAX_DYNAMIC_UNIFORM_BUFFERS` / `DXBRIDGE_MAX_DYNAMIC_STORAGE_BUFFERS`
//! - `DXBRIDGE_STATE_CACHE=0` disables state cache writes.
//! - `DXBRIDGE_COMPILER_THREADS` sets the worker count used when replaying a state cache.
//!
//! Values that fail to parse are ignored.

pub(crate) const MAX_DYNAMIC_UNIFORM_BUFFERS_ENV: &str = "DXBRIDGE_MAX_DYNAMIC_UNIFORM_BUFFERS";
pub(crate) const MAX_DYNAMIC_STORAGE_BUFFERS_ENV: &str = "DXBRIDGE_MAX_DYNAMIC_STORAGE_BUFFERS";
pub(crate) const STATE_CACHE_ENV: &str = "DXBRIDGE_STATE_CACHE";
pub(crate) const COMPILER_THREADS_ENV: &str = "DXBRIDGE_COMPILER_THREADS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Uniform buffers become dynamic only if a pipeline has at most this many.
    pub max_dynamic_uniform_buffers: u32,
    /// Storage buffers become dynamic only if a pipeline has at most this many.
    pub max_dynamic_storage_buffers: u32,
    /// Whether newly compiled pipeline states are reported to the state cache.
    pub enable_state_cache: bool,
    /// Worker threads for state cache replay; `0` picks the available parallelism.
    pub compiler_threads: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_dynamic_uniform_buffers: 8,
            max_dynamic_storage_buffers: 4,
            enable_state_cache: true,
            compiler_threads: 0,
        }
    }
}

impl PipelineOptions {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(v) = parse_number(lookup(MAX_DYNAMIC_UNIFORM_BUFFERS_ENV)) {
            options.max_dynamic_uniform_buffers = v;
        }
        if let Some(v) = parse_number(lookup(MAX_DYNAMIC_STORAGE_BUFFERS_ENV)) {
            options.max_dynamic_storage_buffers = v;
        }
        if let Some(v) = lookup(STATE_CACHE_ENV).as_deref().and_then(parse_bool) {
            options.enable_state_cache = v;
        }
        if let Some(v) = parse_number(lookup(COMPILER_THREADS_ENV)) {
            options.compiler_threads = v;
        }

        options
    }

    /// Replay worker count with `0` resolved against the machine.
    pub fn effective_compiler_threads(&self) -> usize {
        if self.compiler_threads != 0 {
            return self.compiler_threads;
        }
        std::thread::available_parallelism().map_or(1, |n| n.get())
    }
}

fn parse_number<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    raw?.trim().parse().ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    let v = raw.trim();
    if v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
    {
        Some(true)
    } else if v == "0"
        || v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn options_from(vars: &[(&str, &str)]) -> PipelineOptions {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineOptions::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_env() {
        assert_eq!(options_from(&[]), PipelineOptions::default());
    }

    #[test]
    fn env_overrides_are_applied() {
        let options = options_from(&[
            (MAX_DYNAMIC_UNIFORM_BUFFERS_ENV, "2"),
            (MAX_DYNAMIC_STORAGE_BUFFERS_ENV, " 16 "),
            (STATE_CACHE_ENV, "off"),
            (COMPILER_THREADS_ENV, "3"),
        ]);
        assert_eq!(
            options,
            PipelineOptions {
                max_dynamic_uniform_buffers: 2,
                max_dynamic_storage_buffers: 16,
                enable_state_cache: false,
                compiler_threads: 3,
            }
        );
        assert_eq!(options.effective_compiler_threads(), 3);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let options = options_from(&[
            (MAX_DYNAMIC_UNIFORM_BUFFERS_ENV, "-1"),
            (STATE_CACHE_ENV, "maybe"),
            (COMPILER_THREADS_ENV, "many"),
        ]);
        assert_eq!(options, PipelineOptions::default());
        assert!(options.effective_compiler_threads() >= 1);
    }
}
