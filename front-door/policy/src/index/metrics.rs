use prometheus_client::{
    collector::Collector,
    encoding::{DescriptorEncoder, EncodeMetric},
    metrics::{counter::Counter, gauge::ConstGauge, MetricType},
    registry::Registry,
};

use super::SharedIndex;

#[derive(Clone, Debug, Default)]
pub struct IndexMetrics {
    pub(super) load_failures: Counter,
}

#[derive(Debug)]
struct Instrumented(SharedIndex);

impl IndexMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let load_failures = Counter::default();
        reg.register(
            "load_failures",
            "The number of access control documents that could not be loaded",
            load_failures.clone(),
        );
        Self { load_failures }
    }

    pub fn load_failures(&self) -> u64 {
        self.load_failures.get()
    }
}

pub fn register(reg: &mut Registry, index: SharedIndex) {
    reg.register_collector(Box::new(Instrumented(index)));
}

impl Collector for Instrumented {
    fn encode(&self, mut encoder: DescriptorEncoder<'_>) -> Result<(), std::fmt::Error> {
        let this = self.0.read();

        let tenant_encoder = encoder.encode_descriptor(
            "tenant_index_size",
            "The number of tenants in the policy index",
            None,
            MetricType::Gauge,
        )?;
        let tenants = ConstGauge::new(this.tenants.len() as u32);
        tenants.encode(tenant_encoder)?;

        Ok(())
    }
}
