//! Host configuration.
//!
//! Defaults suit interactive use. [`HostConfig::from_env`] layers
//! environment overrides on top of the defaults:
//!
//! | Variable                    | Field               |
//! |-----------------------------|---------------------|
//! | `EDBIND_MAX_RENDER_PASSES`  | `max_render_passes` |
//! | `EDBIND_GUARD_DETACHED`     | `guard_detached`    |
//!
//! Unparseable values are ignored and the default is kept.

/// Environment variable overriding [`HostConfig::max_render_passes`].
pub const ENV_MAX_RENDER_PASSES: &str = "EDBIND_MAX_RENDER_PASSES";
/// Environment variable overriding [`HostConfig::guard_detached`].
pub const ENV_GUARD_DETACHED: &str = "EDBIND_GUARD_DETACHED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    /// Maximum render+commit passes `Root::flush` runs before reporting a
    /// render loop. Never less than 1.
    pub max_render_passes: usize,
    /// Drop listener calls that arrive after their binding detached.
    pub guard_detached: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_render_passes: 50,
            guard_detached: true,
        }
    }
}

impl HostConfig {
    /// Defaults overridden by process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(val) = lookup(ENV_MAX_RENDER_PASSES)
            && let Ok(n) = val.trim().parse::<usize>()
        {
            config.max_render_passes = n.max(1);
        }
        if let Some(val) = lookup(ENV_GUARD_DETACHED)
            && let Some(flag) = parse_flag(&val)
        {
            config.guard_detached = flag;
        }
        config
    }

    #[must_use]
    pub fn with_max_render_passes(mut self, passes: usize) -> Self {
        self.max_render_passes = passes.max(1);
        self
    }

    #[must_use]
    pub fn with_guard_detached(mut self, guard: bool) -> Self {
        self.guard_detached = guard;
        self
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    let val = val.trim();
    if val == "1" || val.eq_ignore_ascii_case("true") || val.eq_ignore_ascii_case("on") {
        Some(true)
    } else if val == "0" || val.eq_ignore_ascii_case("false") || val.eq_ignore_ascii_case("off") {
        Some(false)
    } else {
        None
    }
}
