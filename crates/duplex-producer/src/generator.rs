//! Synthetic batch generators.
//!
//! Each function builds one tick's worth of data as a JSON payload. Values
//! are randomized within realistic ranges; revenue skews higher during
//! business hours.

use chrono::{Local, Timelike};
use rand::Rng;
use serde_json::{json, Value};

const HOSTS: [&str; 3] = ["web-server-1", "web-server-2", "worker-1"];
const ENDPOINTS: [&str; 3] = ["/api/notes", "/api/health", "/ws"];
const STATUSES: [&str; 4] = ["200", "201", "400", "500"];

const EVENT_TYPES: [&str; 8] = [
    "page_view",
    "click",
    "scroll",
    "form_submit",
    "download",
    "search",
    "filter_change",
    "chart_interaction",
];
const PAGE_URLS: [&str; 8] = [
    "/dashboard",
    "/analytics",
    "/monitoring",
    "/settings",
    "/products",
    "/orders",
    "/users",
    "/reports",
];
const DEVICE_TYPES: [&str; 3] = ["desktop", "mobile", "tablet"];
const BROWSERS: [&str; 4] = ["Chrome", "Firefox", "Safari", "Edge"];
const OPERATING_SYSTEMS: [&str; 5] = ["Windows", "macOS", "Linux", "iOS", "Android"];
const COUNTRIES: [&str; 8] = ["US", "CA", "GB", "DE", "FR", "AU", "JP", "BR"];

const ORDER_STATUSES: [(&str, u32); 4] = [
    ("pending", 10),
    ("processing", 30),
    ("shipped", 40),
    ("delivered", 20),
];
const PAYMENT_METHODS: [&str; 3] = ["credit_card", "debit_card", "paypal"];

fn pick<'a, T>(rng: &mut impl Rng, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn weighted<'a>(rng: &mut impl Rng, choices: &'a [(&'a str, u32)]) -> &'a str {
    let total: u32 = choices.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (value, weight) in choices {
        if roll < *weight {
            return value;
        }
        roll -= weight;
    }
    choices[choices.len() - 1].0
}

fn city_for(rng: &mut impl Rng, country: &str) -> &'static str {
    let cities: &[&'static str] = match country {
        "US" => &["New York", "Los Angeles", "Chicago", "Houston", "Phoenix"],
        "CA" => &["Toronto", "Vancouver", "Montreal", "Calgary", "Ottawa"],
        "GB" => &["London", "Manchester", "Birmingham", "Liverpool", "Leeds"],
        "DE" => &["Berlin", "Munich", "Hamburg", "Cologne", "Frankfurt"],
        "FR" => &["Paris", "Lyon", "Marseille", "Toulouse", "Nice"],
        _ => &["Unknown"],
    };
    *pick(rng, cities)
}

/// System and application gauges for the fast tick.
pub fn metrics_batch(rng: &mut impl Rng) -> Value {
    let hostname = *pick(rng, &HOSTS);
    json!({
        "metrics": [
            {
                "metricName": "cpu_usage",
                "metricType": "gauge",
                "value": rng.gen_range(20.0..80.0),
                "unit": "percent",
                "source": "system",
                "tags": { "hostname": hostname },
            },
            {
                "metricName": "memory_usage",
                "metricType": "gauge",
                "value": rng.gen_range(40.0..85.0),
                "unit": "percent",
                "source": "system",
                "tags": { "hostname": hostname },
            },
            {
                "metricName": "disk_usage",
                "metricType": "gauge",
                "value": rng.gen_range(30.0..70.0),
                "unit": "percent",
                "source": "system",
                "tags": { "hostname": hostname },
            },
            {
                "metricName": "response_time",
                "metricType": "histogram",
                "value": rng.gen_range(50.0..500.0),
                "unit": "milliseconds",
                "source": "application",
                "tags": { "endpoint": pick(rng, &ENDPOINTS) },
            },
            {
                "metricName": "request_count",
                "metricType": "counter",
                "value": rng.gen_range(10..=100),
                "unit": "requests",
                "source": "application",
                "tags": { "status": pick(rng, &STATUSES) },
            },
            {
                "metricName": "active_connections",
                "metricType": "gauge",
                "value": rng.gen_range(20..=100),
                "unit": "connections",
                "source": "application",
                "tags": { "service": "websocket" },
            },
        ]
    })
}

fn analytics_event(rng: &mut impl Rng) -> Value {
    let event_type = *pick(rng, &EVENT_TYPES);
    let page_url = *pick(rng, &PAGE_URLS);
    let country = *pick(rng, &COUNTRIES);

    let event_data = match event_type {
        "page_view" => json!({
            "loadTime": rng.gen_range(500..=3000),
            "engagementTime": rng.gen_range(10..=300),
        }),
        "click" => json!({
            "element": pick(rng, &["button", "link", "menu", "chart"]),
            "position": { "x": rng.gen_range(0..=1920), "y": rng.gen_range(0..=1080) },
        }),
        "scroll" => json!({
            "scrollDepth": rng.gen_range(10..=100),
            "maxScroll": rng.gen_range(500..=2000),
        }),
        "form_submit" => json!({
            "formId": pick(rng, &["contact", "search", "filter", "settings"]),
            "fields": rng.gen_range(2..=8),
        }),
        _ => json!({}),
    };

    json!({
        "sessionId": format!("sess_{}", rng.gen_range(1_000_000..=9_999_999u32)),
        "userId": if rng.gen_bool(0.7) { Some(rng.gen_range(1..=10)) } else { None },
        "eventType": event_type,
        "eventName": format!("{}_{}", event_type, page_url.trim_start_matches('/')),
        "pageUrl": page_url,
        "deviceType": pick(rng, &DEVICE_TYPES),
        "browser": pick(rng, &BROWSERS),
        "operatingSystem": pick(rng, &OPERATING_SYSTEMS),
        "country": country,
        "city": city_for(rng, country),
        "eventData": event_data,
    })
}

/// 5-15 user interaction events for the medium tick.
pub fn analytics_batch(rng: &mut impl Rng) -> Value {
    let count = rng.gen_range(5..=15);
    let events: Vec<Value> = (0..count).map(|_| analytics_event(rng)).collect();
    json!({ "events": events })
}

fn order(rng: &mut impl Rng) -> Value {
    let status = weighted(rng, &ORDER_STATUSES);
    let payment_status = if status == "shipped" || status == "delivered" {
        "completed"
    } else {
        *pick(rng, &["pending", "completed"])
    };
    json!({
        "orderNumber": format!(
            "ORD-{}-{}",
            Local::now().format("%Y%m%d"),
            rng.gen_range(1000..=9999)
        ),
        "status": status,
        "totalAmount": rng.gen_range(15.0..600.0),
        "paymentMethod": pick(rng, &PAYMENT_METHODS),
        "paymentStatus": payment_status,
        "items": rng.gen_range(1..=5),
    })
}

/// Orders and revenue for the slow tick. Revenue scales with the hour of
/// day so dashboards show a business-hours curve.
pub fn business_batch(rng: &mut impl Rng) -> Value {
    let order_count = rng.gen_range(1..=3);
    let orders: Vec<Value> = (0..order_count).map(|_| order(rng)).collect();

    let hour = Local::now().hour();
    let base_revenue = 1000.0 + (hour as f64 * 50.0);

    json!({
        "orders": orders,
        "revenuePerHour": base_revenue + rng.gen_range(-200.0..400.0),
        "conversionRate": rng.gen_range(2.5..4.5),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn metrics_batch_covers_system_and_application() {
        let batch = metrics_batch(&mut rng());
        let metrics = batch["metrics"].as_array().unwrap();
        assert_eq!(metrics.len(), 6);

        let names: Vec<&str> = metrics
            .iter()
            .map(|m| m["metricName"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"cpu_usage"));
        assert!(names.contains(&"response_time"));
        assert!(names.contains(&"active_connections"));

        for m in metrics {
            assert!(m["value"].is_number());
            assert!(m["tags"].is_object());
        }
    }

    #[test]
    fn gauge_values_stay_in_range() {
        let mut r = rng();
        for _ in 0..50 {
            let batch = metrics_batch(&mut r);
            let cpu = batch["metrics"][0]["value"].as_f64().unwrap();
            assert!((20.0..80.0).contains(&cpu), "cpu out of range: {cpu}");
        }
    }

    #[test]
    fn analytics_batch_size_is_bounded() {
        let mut r = rng();
        for _ in 0..20 {
            let batch = analytics_batch(&mut r);
            let n = batch["events"].as_array().unwrap().len();
            assert!((5..=15).contains(&n), "batch size out of range: {n}");
        }
    }

    #[test]
    fn analytics_events_have_consistent_shape() {
        let batch = analytics_batch(&mut rng());
        for event in batch["events"].as_array().unwrap() {
            assert!(event["sessionId"].as_str().unwrap().starts_with("sess_"));
            assert!(EVENT_TYPES.contains(&event["eventType"].as_str().unwrap()));
            assert!(event["eventName"]
                .as_str()
                .unwrap()
                .starts_with(event["eventType"].as_str().unwrap()));
            assert!(event["eventData"].is_object());
        }
    }

    #[test]
    fn order_numbers_follow_the_dated_format() {
        let batch = business_batch(&mut rng());
        for order in batch["orders"].as_array().unwrap() {
            let number = order["orderNumber"].as_str().unwrap();
            assert!(number.starts_with("ORD-"), "got: {number}");
            assert_eq!(number.len(), "ORD-20260101-1234".len(), "got: {number}");
        }
    }

    #[test]
    fn business_batch_carries_revenue_and_conversion() {
        let batch = business_batch(&mut rng());
        assert!(batch["revenuePerHour"].as_f64().unwrap() > 0.0);
        let rate = batch["conversionRate"].as_f64().unwrap();
        assert!((2.5..4.5).contains(&rate));
    }

    #[test]
    fn shipped_orders_are_always_paid() {
        let mut r = rng();
        for _ in 0..50 {
            let batch = business_batch(&mut r);
            for order in batch["orders"].as_array().unwrap() {
                let status = order["status"].as_str().unwrap();
                if status == "shipped" || status == "delivered" {
                    assert_eq!(order["paymentStatus"], "completed");
                }
            }
        }
    }
}
