use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub bookings_created_total: IntCounter,
    pub bids_placed_total: IntCounter,
    pub arbitration_total: IntCounterVec,
    pub bookings_expired_total: IntCounter,
    pub pending_bookings: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let bookings_created_total =
            IntCounter::new("bookings_created_total", "Total ride bookings created")
                .expect("valid bookings_created_total metric");

        let bids_placed_total = IntCounter::new("bids_placed_total", "Total driver bids placed")
            .expect("valid bids_placed_total metric");

        let arbitration_total = IntCounterVec::new(
            Opts::new("arbitration_total", "Arbitration calls by operation and outcome"),
            &["operation", "outcome"],
        )
        .expect("valid arbitration_total metric");

        let bookings_expired_total = IntCounter::new(
            "bookings_expired_total",
            "Pending bookings cancelled by the lifecycle sweep",
        )
        .expect("valid bookings_expired_total metric");

        let pending_bookings =
            IntGauge::new("pending_bookings", "Current number of pending bookings")
                .expect("valid pending_bookings metric");

        registry
            .register(Box::new(bookings_created_total.clone()))
            .expect("register bookings_created_total");
        registry
            .register(Box::new(bids_placed_total.clone()))
            .expect("register bids_placed_total");
        registry
            .register(Box::new(arbitration_total.clone()))
            .expect("register arbitration_total");
        registry
            .register(Box::new(bookings_expired_total.clone()))
            .expect("register bookings_expired_total");
        registry
            .register(Box::new(pending_bookings.clone()))
            .expect("register pending_bookings");

        Self {
            registry,
            bookings_created_total,
            bids_placed_total,
            arbitration_total,
            bookings_expired_total,
            pending_bookings,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
