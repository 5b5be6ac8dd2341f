//! Container runtime handler registry (§9, same "resolve via registry"
//! guidance as the network plugin registry in `network::plugin`).

use super::config::ContainerConfig;
use boxd_shared::errors::{CoreError, CoreResult};

/// A runtime handler: knows how to turn a container config into the
/// sandbox helper's launch binary and arguments.
pub trait RuntimePlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn helper_binary(&self) -> &'static str;

    fn helper_args(&self, config: &ContainerConfig) -> Vec<String>;
}

inventory::collect!(&'static dyn RuntimePlugin);

pub fn lookup_plugin(name: &str) -> CoreResult<&'static dyn RuntimePlugin> {
    inventory::iter::<&'static dyn RuntimePlugin>()
        .find(|p| p.name() == name)
        .copied()
        .ok_or_else(|| CoreError::Unsupported(format!("no runtime plugin registered for '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopRuntime;

    impl RuntimePlugin for NoopRuntime {
        fn name(&self) -> &'static str {
            "test-noop-runtime"
        }

        fn helper_binary(&self) -> &'static str {
            "true"
        }

        fn helper_args(&self, _config: &ContainerConfig) -> Vec<String> {
            Vec::new()
        }
    }

    static NOOP: NoopRuntime = NoopRuntime;
    inventory::submit! { &NOOP as &dyn RuntimePlugin }

    #[test]
    fn lookup_finds_registered_plugin() {
        assert!(lookup_plugin("test-noop-runtime").is_ok());
    }

    #[test]
    fn lookup_missing_plugin_is_unsupported() {
        let err = lookup_plugin("does-not-exist").unwrap_err();
        assert_eq!(err.kind_code(), "unsupported");
    }
}
