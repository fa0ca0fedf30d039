//! Per-country memoization of processed series.
//!
//! A cache is bound to one dataset. Swapping the dataset clears every entry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{CountrySeries, DailyRecord};
use crate::error::AnalysisError;
use crate::process::processor::SeriesProcessor;

#[derive(Debug, Clone)]
pub struct SeriesCache {
    processor: SeriesProcessor,
    records: Arc<Vec<DailyRecord>>,
    entries: HashMap<String, Arc<CountrySeries>>,
    hits: usize,
    misses: usize,
}

impl SeriesCache {
    pub fn new(records: Arc<Vec<DailyRecord>>) -> Self {
        Self::with_processor(records, SeriesProcessor::default())
    }

    pub fn with_processor(records: Arc<Vec<DailyRecord>>, processor: SeriesProcessor) -> Self {
        Self {
            processor,
            records,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    /// Replace the underlying dataset and drop every cached series.
    pub fn replace_dataset(&mut self, records: Arc<Vec<DailyRecord>>) {
        self.records = records;
        self.entries.clear();
    }

    /// Processed series for `country`, computed at most once per dataset.
    ///
    /// Failures are returned but not cached.
    pub fn series(&mut self, country: &str) -> Result<Arc<CountrySeries>, AnalysisError> {
        if let Some(series) = self.entries.get(country) {
            self.hits += 1;
            debug!(country, "series cache hit");
            return Ok(Arc::clone(series));
        }

        self.misses += 1;
        let series = Arc::new(self.processor.process(&self.records, country)?);
        self.entries.insert(country.to_string(), Arc::clone(&series));
        Ok(series)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{SampleConfig, generate_sample};

    #[test]
    fn second_lookup_is_a_hit_and_replacement_invalidates() {
        let config = SampleConfig::default();
        let records = Arc::new(generate_sample(&config));
        let country = config.countries[0].clone();

        let mut cache = SeriesCache::new(Arc::clone(&records));
        let a = cache.series(&country).unwrap();
        let b = cache.series(&country).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        cache.replace_dataset(records);
        assert!(cache.is_empty());
        let c = cache.series(&country).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let mut cache = SeriesCache::new(Arc::new(Vec::new()));
        assert!(cache.series("Nowhere").is_err());
        assert!(cache.is_empty());
    }
}
