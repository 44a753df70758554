//! Process-wide category registry
//!
//! Categories are registered explicitly by the components that log through
//! them. Level rules are parsed from a `category:level` list and applied to
//! every category already registered as well as to those registered later.

use super::severity::LogSeverity;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Environment variable read by [`Logger::init`]
pub const LOG_LEVELS_ENV: &str = "CRABCAMERA_AF_LOG_LEVELS";

/// Category for messages that belong to no component
pub const DEFAULT_CATEGORY: &str = "default";

/// Severity of a category no rule matches
pub const DEFAULT_SEVERITY: LogSeverity = LogSeverity::Info;

/// A single `category:level` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelRule {
    pub pattern: String,
    pub severity: LogSeverity,
}

impl LevelRule {
    /// A trailing `*` matches every category starting with the text before it
    pub fn matches(&self, name: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => self.pattern == name,
        }
    }
}

/// Ordered list of level rules; the first matching rule wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelRules {
    rules: Vec<LevelRule>,
}

impl LevelRules {
    /// Parse a comma separated list of `category:level` pairs.
    ///
    /// A bare level is shorthand for `*:level`. Empty pairs, pairs missing
    /// either half and unknown levels are skipped.
    pub fn parse(levels: &str) -> Self {
        let mut rules = Vec::new();

        for pair in levels.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }

            let (category, level) = match pair.split_once(':') {
                Some((category, level)) => (category.trim(), level.trim()),
                None => ("*", pair),
            };
            if category.is_empty() || level.is_empty() {
                continue;
            }

            match level.parse::<LogSeverity>() {
                Ok(severity) => rules.push(LevelRule {
                    pattern: category.to_string(),
                    severity,
                }),
                Err(e) => log::warn!("Ignoring log level rule '{}': {}", pair, e),
            }
        }

        Self { rules }
    }

    pub fn severity_for(&self, name: &str) -> Option<LogSeverity> {
        self.rules
            .iter()
            .find(|rule| rule.matches(name))
            .map(|rule| rule.severity)
    }

    pub fn rules(&self) -> &[LevelRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A named message category with its minimum severity
#[derive(Debug)]
pub struct LogCategory {
    name: String,
    severity: AtomicU8,
}

impl LogCategory {
    fn new(name: &str, severity: LogSeverity) -> Self {
        Self {
            name: name.to_string(),
            severity: AtomicU8::new(severity as u8),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn severity(&self) -> LogSeverity {
        LogSeverity::from_u8(self.severity.load(Ordering::Relaxed)).unwrap_or(DEFAULT_SEVERITY)
    }

    pub fn set_severity(&self, severity: LogSeverity) {
        self.severity.store(severity as u8, Ordering::Relaxed);
    }

    /// Whether a message of `severity` passes this category's filter
    pub fn enabled(&self, severity: LogSeverity) -> bool {
        severity >= self.severity()
    }
}

#[derive(Default)]
struct Registry {
    categories: HashMap<String, Arc<LogCategory>>,
    rules: LevelRules,
}

lazy_static::lazy_static! {
    static ref REGISTRY: Mutex<Registry> = Mutex::new(Registry::default());
}

fn registry() -> MutexGuard<'static, Registry> {
    // A panic while holding the lock leaves the map consistent
    REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Entry point to the category registry
pub struct Logger;

impl Logger {
    /// Load level rules from [`LOG_LEVELS_ENV`]
    pub fn init() {
        let levels = std::env::var(LOG_LEVELS_ENV).unwrap_or_default();
        Self::init_with(&levels);
    }

    /// Load level rules from an explicit list
    pub fn init_with(levels: &str) {
        Self::configure(LevelRules::parse(levels));
    }

    /// Replace the level rules and re-apply them to every registered category
    pub fn configure(rules: LevelRules) {
        let mut registry = registry();
        for category in registry.categories.values() {
            category.set_severity(rules.severity_for(category.name()).unwrap_or(DEFAULT_SEVERITY));
        }
        registry.rules = rules;
    }

    /// Return the category named `name`, registering it on first use
    pub fn category(name: &str) -> Arc<LogCategory> {
        let mut registry = registry();
        if let Some(category) = registry.categories.get(name) {
            return Arc::clone(category);
        }

        let severity = registry.rules.severity_for(name).unwrap_or(DEFAULT_SEVERITY);
        let category = Arc::new(LogCategory::new(name, severity));
        registry
            .categories
            .insert(name.to_string(), Arc::clone(&category));
        category
    }

    /// The built-in [`DEFAULT_CATEGORY`]
    pub fn default_category() -> Arc<LogCategory> {
        Self::category(DEFAULT_CATEGORY)
    }

    pub fn lookup(name: &str) -> Option<Arc<LogCategory>> {
        registry().categories.get(name).cloned()
    }

    pub fn unregister(name: &str) -> bool {
        registry().categories.remove(name).is_some()
    }

    /// Registered category names, sorted
    pub fn categories() -> Vec<String> {
        let mut names: Vec<String> = registry().categories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop every category and rule. Handles already held keep working but
    /// are no longer reconfigured.
    pub fn teardown() {
        let mut registry = registry();
        registry.categories.clear();
        registry.rules = LevelRules::default();
    }
}
