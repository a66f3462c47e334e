//! Search tests: ranking, thresholds, properties and filters
