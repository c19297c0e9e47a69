use shared::metrics_defs::{MetricDef, MetricType};

pub const REDIRECTS: MetricDef = MetricDef {
    name: "redirect.count",
    metric_type: MetricType::Counter,
    description: "Campaign link redirects. Tagged with platform and provenance.",
};

pub const UNKNOWN_SLUG: MetricDef = MetricDef {
    name: "redirect.unknown_slug",
    metric_type: MetricType::Counter,
    description: "Requests for a slug that matches no campaign",
};

pub const USAGE_RECORD_FAILED: MetricDef = MetricDef {
    name: "redirect.usage_record_failed",
    metric_type: MetricType::Counter,
    description: "Phone usage records that could not be stored",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "redirect.request.duration",
    metric_type: MetricType::Histogram,
    description: "Redirect request duration in seconds. Tagged with status.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REDIRECTS,
    UNKNOWN_SLUG,
    USAGE_RECORD_FAILED,
    REQUEST_DURATION,
];
