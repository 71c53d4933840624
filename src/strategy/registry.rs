//! Mode-keyed strategy lookup

use std::collections::BTreeMap;
use std::sync::Arc;
use crate::context::Mode;
use crate::error::{StemRouteError, Result};
use super::{DualExtractor, LeadBackVocalExtractor, ProcessingStrategy, SingleExtractor, SoundCreator};

/// Mode -> strategy lookup
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<Mode, Arc<dyn ProcessingStrategy>>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::standard(5.0)
    }
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self { strategies: BTreeMap::new() }
    }

    /// Registry with a strategy for every mode
    pub fn standard(default_sound_duration: f64) -> Self {
        let mut registry = Self::empty();
        registry.register(SingleExtractor::vocal());
        registry.register(SingleExtractor::instrumental());
        registry.register(DualExtractor::new());
        registry.register(LeadBackVocalExtractor::new());
        registry.register(SingleExtractor::de_reverb());
        registry.register(SingleExtractor::de_echo());
        registry.register(SingleExtractor::de_noise());
        registry.register(SingleExtractor::stems());
        registry.register(SoundCreator::new(default_sound_duration));
        registry
    }

    /// Register a strategy under its own mode, replacing any previous one
    pub fn register<S: ProcessingStrategy + 'static>(&mut self, strategy: S) {
        self.strategies.insert(strategy.mode(), Arc::new(strategy));
    }

    pub fn get(&self, mode: Mode) -> Result<Arc<dyn ProcessingStrategy>> {
        self.strategies
            .get(&mode)
            .cloned()
            .ok_or_else(|| StemRouteError::UnsupportedMode(mode.to_string()))
    }

    /// Look a strategy up by its wire name
    pub fn get_strategy(&self, mode: &str) -> Result<Arc<dyn ProcessingStrategy>> {
        self.get(mode.parse()?)
    }

    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        self.strategies.keys().copied()
    }
}
