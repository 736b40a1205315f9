use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub fare_requests_total: IntCounterVec,
    pub fare_request_latency_seconds: HistogramVec,
    pub trip_plans_total: IntCounterVec,
    pub otp_requests_total: IntCounterVec,
    pub active_sessions: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let fare_requests_total = IntCounterVec::new(
            Opts::new("fare_requests_total", "Fare service calls by outcome"),
            &["outcome"],
        )
        .expect("valid fare_requests_total metric");

        let fare_request_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "fare_request_latency_seconds",
                "Latency of fare service calls in seconds",
            ),
            &["outcome"],
        )
        .expect("valid fare_request_latency_seconds metric");

        let trip_plans_total = IntCounterVec::new(
            Opts::new("trip_plans_total", "Trip planner submissions by outcome"),
            &["outcome"],
        )
        .expect("valid trip_plans_total metric");

        let otp_requests_total = IntCounterVec::new(
            Opts::new("otp_requests_total", "OTP provider calls by stage and outcome"),
            &["stage", "outcome"],
        )
        .expect("valid otp_requests_total metric");

        let active_sessions = IntGauge::new("active_sessions", "Signed-in sessions")
            .expect("valid active_sessions metric");

        registry
            .register(Box::new(fare_requests_total.clone()))
            .expect("register fare_requests_total");
        registry
            .register(Box::new(fare_request_latency_seconds.clone()))
            .expect("register fare_request_latency_seconds");
        registry
            .register(Box::new(trip_plans_total.clone()))
            .expect("register trip_plans_total");
        registry
            .register(Box::new(otp_requests_total.clone()))
            .expect("register otp_requests_total");
        registry
            .register(Box::new(active_sessions.clone()))
            .expect("register active_sessions");

        Self {
            registry,
            fare_requests_total,
            fare_request_latency_seconds,
            trip_plans_total,
            otp_requests_total,
            active_sessions,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
