//! Error types.

use thiserror::Error;

/// Failure while rendering or committing a component tree.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A hook slot holds a different type than the hook now asking for it.
    #[error("hook #{index} in `{component}` changed type between renders")]
    HookMismatch {
        component: &'static str,
        index: usize,
    },

    /// A re-render called a different number of hooks than the first render.
    #[error("`{component}` called {found} hooks, expected {expected}")]
    HookCount {
        component: &'static str,
        expected: usize,
        found: usize,
    },

    /// Updates kept scheduling further updates.
    #[error("render did not settle after {limit} passes")]
    RenderLoop { limit: usize },

    /// Application code inside a component reported a failure.
    #[error("`{component}` failed to render: {message}")]
    Component {
        component: &'static str,
        message: String,
    },
}

impl RenderError {
    /// Report an application-level render failure.
    pub fn component(component: &'static str, message: impl Into<String>) -> Self {
        Self::Component {
            component,
            message: message.into(),
        }
    }
}

/// Failure while loading a [`HostConfig`](crate::config::HostConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid host config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_render_passes must be at least 1")]
    ZeroPasses,
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
