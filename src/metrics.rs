use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, IntCounterVec, register_counter, register_gauge, register_histogram,
    register_int_counter_vec,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("location_relay_requests_total", "Total number of send-location requests")
            .expect("register requests counter");
    // stage = unauthorized | rate_limited | invalid_payload
    pub static ref REJECTIONS: IntCounterVec = register_int_counter_vec!(
        "location_relay_rejections_total",
        "Requests stopped before delivery",
        &["stage"]
    )
    .expect("register rejections counter");
    // outcome = sent | failed | not_configured
    pub static ref DELIVERIES: IntCounterVec = register_int_counter_vec!(
        "location_relay_deliveries_total",
        "Delivery attempts by outcome",
        &["outcome"]
    )
    .expect("register deliveries counter");
    pub static ref SEND_LATENCY: Histogram = register_histogram!(
        "location_relay_send_latency_seconds",
        "Transport latency in seconds"
    )
    .expect("register latency histogram");
    pub static ref RATE_LIMIT_ENTRIES: Gauge = register_gauge!(
        "location_relay_rate_limit_entries",
        "Current number of tracked rate limit windows"
    )
    .expect("register entries gauge");
}
