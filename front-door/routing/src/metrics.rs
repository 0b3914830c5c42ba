use front_door_core::RouteError;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug, Default)]
pub struct RouteMetrics {
    routed: Family<StrategyLabels, Counter>,
    failed: Family<StatusLabels, Counter>,
}

/// How a request's destination was chosen.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    Management,
    FirstHost,
    Hash,
    RoundRobin,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct StrategyLabels {
    strategy: &'static str,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct StatusLabels {
    status: String,
}

// === impl RouteMetrics ===

impl RouteMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let routed = Family::<StrategyLabels, Counter>::default();
        reg.register(
            "routed",
            "Total number of requests routed, by selection strategy",
            routed.clone(),
        );

        let failed = Family::<StatusLabels, Counter>::default();
        reg.register(
            "failed",
            "Total number of requests that could not be routed, by response status",
            failed.clone(),
        );

        Self { routed, failed }
    }

    pub(crate) fn routed(&self, strategy: Strategy) {
        self.routed
            .get_or_create(&StrategyLabels {
                strategy: strategy.as_str(),
            })
            .inc();
    }

    pub(crate) fn failed(&self, error: &RouteError) {
        self.failed
            .get_or_create(&StatusLabels {
                status: error.status().as_u16().to_string(),
            })
            .inc();
    }
}

// === impl Strategy ===

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Management => "management",
            Self::FirstHost => "first_host",
            Self::Hash => "hash",
            Self::RoundRobin => "round_robin",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}
