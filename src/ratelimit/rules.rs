//! Rate limit rules configuration and lookup.
//!
//! Rules map route names to policies. They are loaded from YAML and held in
//! a [`PolicyTable`] that handlers consult on every request and that can be
//! swapped at runtime when the rules file changes.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::policy::{Policy, TimeWindow};
use crate::error::{Result, TripgateError};

/// Route name used by the chat endpoint.
pub const CHAT_ROUTE: &str = "chat";

/// A complete rules document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rule for routes without their own entry
    #[serde(default)]
    pub default: Option<RateLimitRule>,
    /// Map of route name to its rule
    #[serde(default)]
    pub routes: HashMap<String, RateLimitRule>,
}

/// A rate limit rule specifying the limit and time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// Number of requests allowed per unit of time
    pub requests_per_unit: u64,
    /// The time unit
    pub unit: TimeWindow,
    /// Optional name/description for this limit
    #[serde(default)]
    pub name: Option<String>,
}

impl From<&RateLimitRule> for Policy {
    fn from(rule: &RateLimitRule) -> Self {
        Policy::per_window(rule.unit, rule.requests_per_unit)
    }
}

impl RulesConfig {
    /// Create an empty rules document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The rules in effect when no rules file is configured.
    pub fn builtin() -> Self {
        let mut rules = Self::new();
        rules.routes.insert(
            CHAT_ROUTE.to_string(),
            RateLimitRule {
                requests_per_unit: Policy::chat().max_requests,
                unit: TimeWindow::Minute,
                name: Some("chat-per-client".to_string()),
            },
        );
        rules
    }

    /// Fill in built-in routes the document does not define.
    ///
    /// Routes the document names keep its rule, so a rules file can
    /// override the chat limit but cannot drop it by omission.
    pub fn with_builtin_routes(mut self) -> Self {
        for (route, rule) in Self::builtin().routes {
            self.routes.entry(route).or_insert(rule);
        }
        self
    }

    /// Load rules from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load rules from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rules: RulesConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TripgateError::Config(format!("Failed to parse rate limit rules: {}", e)))?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject rules whose policies would admit nothing.
    pub fn validate(&self) -> Result<()> {
        if let Some(rule) = &self.default {
            Policy::from(rule)
                .validate()
                .map_err(|e| TripgateError::Config(format!("default rule: {}", e)))?;
        }
        for (route, rule) in &self.routes {
            Policy::from(rule)
                .validate()
                .map_err(|e| TripgateError::Config(format!("route '{}': {}", route, e)))?;
        }
        Ok(())
    }

    /// Find the rule for a route, falling back to the document's default.
    pub fn find_rule(&self, route: &str) -> Option<&RateLimitRule> {
        self.routes.get(route).or(self.default.as_ref())
    }
}

/// The active rules, shared between request handlers and the reload task.
#[derive(Debug)]
pub struct PolicyTable {
    /// Current rules document
    rules: RwLock<RulesConfig>,
    /// Policy for routes no rule covers
    fallback: Policy,
}

impl PolicyTable {
    /// Create a table over `rules`, using `fallback` where no rule matches.
    pub fn new(rules: RulesConfig, fallback: Policy) -> Self {
        Self {
            rules: RwLock::new(rules),
            fallback,
        }
    }

    /// Resolve the policy for a route.
    pub fn policy_for(&self, route: &str) -> Policy {
        self.rules
            .read()
            .find_rule(route)
            .map(Policy::from)
            .unwrap_or(self.fallback)
    }

    /// The policy for callers that name no route.
    ///
    /// The rules document's `default` rule wins over the fallback.
    pub fn default_policy(&self) -> Policy {
        self.rules
            .read()
            .default
            .as_ref()
            .map(Policy::from)
            .unwrap_or(self.fallback)
    }

    /// Swap in a new rules document.
    pub fn replace(&self, rules: RulesConfig) {
        let mut current = self.rules.write();
        *current = rules;
    }

    /// Re-read a rules file and swap it in, keeping built-in routes the
    /// file leaves out.
    ///
    /// On error the current rules stay active.
    pub fn reload_from<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let rules = RulesConfig::from_file(path)?.with_builtin_routes();
        self.replace(rules);
        Ok(())
    }

    /// Get a copy of the current rules.
    pub fn rules(&self) -> RulesConfig {
        self.rules.read().clone()
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new(RulesConfig::builtin(), Policy::default())
    }
}
