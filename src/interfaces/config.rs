use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::application::{ConfigError, HttpTransport, TemplateEngine, WatchRegistry};
use crate::domain::{AlwaysConditionFactory, NoneInputFactory};
use crate::infrastructure::compare_condition::CompareConditionFactory;
use crate::infrastructure::logging_action::LoggingActionFactory;
use crate::infrastructure::reqwest_transport::ReqwestTransport;
use crate::infrastructure::schedule_trigger::ScheduleTriggerFactory;
use crate::infrastructure::script_transform::ScriptTransformFactory;
use crate::infrastructure::simple_input::SimpleInputFactory;
use crate::infrastructure::var_template::VarTemplateEngine;
use crate::infrastructure::webhook_action::WebhookActionFactory;

#[derive(Debug, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
}

fn default_http_timeout_seconds() -> u64 {
    30
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            http_timeout_seconds: default_http_timeout_seconds(),
        }
    }
}

impl WatcherConfig {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let raw = expand_env(&raw);
        let cfg: WatcherConfig = serde_yaml::from_str(&raw)?;
        Ok(cfg)
    }
}

/// very small ${VAR} expansion to keep config simple
fn expand_env(s: &str) -> String {
    let mut out = s.to_string();
    for (k, v) in std::env::vars() {
        out = out.replace(&format!("${{{}}}", k), &v);
    }
    out
}

/// Wires the built-in component kinds into a fresh registry, injecting the
/// shared HTTP transport and template engine into the action factories.
pub fn default_registry(cfg: &WatcherConfig) -> Result<WatchRegistry, ConfigError> {
    let transport = ReqwestTransport::new(Duration::from_secs(cfg.http_timeout_seconds))
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    registry_with_services(Arc::new(transport), Arc::new(VarTemplateEngine::new()))
}

/// Same wiring with caller-supplied services; tests pass a fake transport.
pub fn registry_with_services(
    transport: Arc<dyn HttpTransport>,
    templates: Arc<dyn TemplateEngine>,
) -> Result<WatchRegistry, ConfigError> {
    let mut registry = WatchRegistry::new();

    registry.register_trigger(Arc::new(ScheduleTriggerFactory))?;

    registry.register_input(Arc::new(NoneInputFactory))?;
    registry.register_input(Arc::new(SimpleInputFactory))?;

    registry.register_condition(Arc::new(AlwaysConditionFactory))?;
    registry.register_condition(Arc::new(CompareConditionFactory))?;

    registry.register_transform(Arc::new(ScriptTransformFactory))?;

    registry.register_action(Arc::new(WebhookActionFactory::new(
        Arc::clone(&transport),
        Arc::clone(&templates),
    )))?;
    registry.register_action(Arc::new(LoggingActionFactory::new(templates)))?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_timeout() {
        let cfg = WatcherConfig::default();
        assert_eq!(cfg.http_timeout_seconds, 30);
    }

    #[test]
    fn config_parses_from_yaml() {
        let cfg: WatcherConfig = serde_yaml::from_str("http_timeout_seconds: 5").unwrap();
        assert_eq!(cfg.http_timeout_seconds, 5);

        let cfg: WatcherConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.http_timeout_seconds, 30);
    }

    #[test]
    fn default_wiring_registers_every_builtin_kind() {
        let registry = default_registry(&WatcherConfig::default()).unwrap();
        assert!(registry.lookup_action("webhook", "a").is_ok());
        assert!(registry.lookup_action("logging", "a").is_ok());
        assert!(registry.lookup_action("email", "a").is_err());
    }
}
