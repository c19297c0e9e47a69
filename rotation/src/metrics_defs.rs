//! Metrics definitions for phone rotation.

use shared::metrics_defs::{MetricDef, MetricType};

pub const SELECTIONS: MetricDef = MetricDef {
    name: "rotation.selection",
    metric_type: MetricType::Counter,
    description: "Number of phone selections. Tagged with provenance.",
};

pub const SELECTION_DURATION: MetricDef = MetricDef {
    name: "rotation.selection.duration",
    metric_type: MetricType::Histogram,
    description: "Time to select a phone in seconds, storage calls included",
};

pub const STORE_ERRORS: MetricDef = MetricDef {
    name: "rotation.store.error",
    metric_type: MetricType::Counter,
    description: "Storage errors that forced a fallback to the default phone",
};

pub const STICKY_LOOKUP: MetricDef = MetricDef {
    name: "rotation.sticky.lookup",
    metric_type: MetricType::Counter,
    description: "Sticky mapping lookups. Tagged with outcome (hit, miss, stale).",
};

pub const STICKY_WRITE_FAILED: MetricDef = MetricDef {
    name: "rotation.sticky.write_failed",
    metric_type: MetricType::Counter,
    description: "Sticky mapping writes that failed and were dropped",
};

pub const STICKY_SWEEP_REMOVED: MetricDef = MetricDef {
    name: "rotation.sticky.sweep.removed",
    metric_type: MetricType::Counter,
    description: "Expired sticky mappings removed by the background sweep",
};

pub const STICKY_SWEEP_FAILED: MetricDef = MetricDef {
    name: "rotation.sticky.sweep.failed",
    metric_type: MetricType::Counter,
    description: "Background sweeps that returned an error",
};

pub const ALL_METRICS: &[MetricDef] = &[
    SELECTIONS,
    SELECTION_DURATION,
    STORE_ERRORS,
    STICKY_LOOKUP,
    STICKY_WRITE_FAILED,
    STICKY_SWEEP_REMOVED,
    STICKY_SWEEP_FAILED,
];
