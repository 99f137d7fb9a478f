//! `[ADDED]` Ingress adapter (C18): parses a raw JSON sample packet off the
//! `vibration/raw/<SITE>/<ASSET>/<POINT>` topic (§6), including the legacy
//! 4-segment form `vibration/raw/<ASSET>/<POINT>` (SITE = `default`).
//!
//! The transport itself (MQTT subscribe loop) is out of scope (§1) — this
//! module only turns `(topic, payload bytes)` into a [`SamplePacket`] or a
//! counted [`IngestError`].

use crate::domain::SamplePacket;
use crate::errors::IngestError;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Deserialize)]
struct RawPayload {
    site: Option<String>,
    asset: Option<String>,
    point: Option<String>,
    rpm: Option<f64>,
    temperature: Option<f64>,
    speed: Option<f64>,
    timestamp: Option<f64>,
    acceleration: Option<Vec<f64>>,
}

/// Split a topic into `(site, asset, point)`. Accepts both the canonical
/// 5-segment form and the legacy 4-segment one.
pub fn parse_topic(topic: &str) -> Option<(String, String, String)> {
    let parts: Vec<&str> = topic.split('/').collect();
    match parts.as_slice() {
        ["vibration", "raw", site, asset, point] => {
            Some((site.to_string(), asset.to_string(), point.to_string()))
        }
        ["vibration", "raw", asset, point] => {
            Some(("default".to_string(), asset.to_string(), point.to_string()))
        }
        _ => None,
    }
}

/// Parse one ingress message into a `SamplePacket`. The topic's
/// `(site, asset, point)` wins when the topic is recognized; otherwise the
/// payload's own `site`/`asset`/`point` fields are used (`site` defaults to
/// `default`). Missing/empty/non-finite `acceleration` is reported via
/// `IngestError` — callers drop silently and count it (§3, §7).
pub fn parse_sample_packet(topic: &str, payload_json: &str) -> Result<SamplePacket, IngestError> {
    let raw: RawPayload =
        serde_json::from_str(payload_json).map_err(|e| IngestError::Malformed(e.to_string()))?;

    let (site, asset, point) = match parse_topic(topic) {
        Some(ids) => ids,
        None => match (raw.asset.clone(), raw.point.clone()) {
            (Some(asset), Some(point)) => (raw.site.clone().unwrap_or_else(|| "default".into()), asset, point),
            _ => return Err(IngestError::UnrecognizedTopic(topic.to_string())),
        },
    };

    let acceleration = raw.acceleration.ok_or(IngestError::MissingAcceleration)?;
    if acceleration.is_empty() {
        return Err(IngestError::MissingAcceleration);
    }
    if !acceleration.iter().all(|v| v.is_finite()) {
        return Err(IngestError::NonFiniteSample);
    }

    Ok(SamplePacket {
        site,
        asset,
        point,
        rpm: raw.rpm,
        temperature: raw.temperature,
        speed: raw.speed,
        timestamp: raw.timestamp,
        acceleration,
    })
}

/// Ingress-level counters (§7: malformed packets are dropped silently but
/// counted).
#[derive(Default)]
pub struct IngressStats {
    received: AtomicU64,
    dropped: AtomicU64,
}

impl IngressStats {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_5_segment_topic_parses_site_asset_point() {
        let (site, asset, point) = parse_topic("vibration/raw/SITE_A/PUMP01/DE").unwrap();
        assert_eq!((site.as_str(), asset.as_str(), point.as_str()), ("SITE_A", "PUMP01", "DE"));
    }

    #[test]
    fn legacy_4_segment_topic_defaults_site() {
        let (site, asset, point) = parse_topic("vibration/raw/PUMP01/DE").unwrap();
        assert_eq!((site.as_str(), asset.as_str(), point.as_str()), ("default", "PUMP01", "DE"));
    }

    #[test]
    fn unrecognized_topic_shape_is_none() {
        assert!(parse_topic("something/else").is_none());
    }

    #[test]
    fn missing_acceleration_field_is_an_ingest_error() {
        let payload = r#"{"site":"s","asset":"a","point":"p"}"#;
        let err = parse_sample_packet("vibration/raw/s/a/p", payload).unwrap_err();
        assert_eq!(err, IngestError::MissingAcceleration);
    }

    #[test]
    fn empty_acceleration_array_is_an_ingest_error() {
        let payload = r#"{"acceleration":[]}"#;
        let err = parse_sample_packet("vibration/raw/s/a/p", payload).unwrap_err();
        assert_eq!(err, IngestError::MissingAcceleration);
    }

    #[test]
    fn valid_packet_parses_successfully() {
        let payload = r#"{"acceleration":[0.1,0.2,-0.1],"rpm":1800}"#;
        let packet = parse_sample_packet("vibration/raw/SITE_A/PUMP01/DE", payload).unwrap();
        assert_eq!(packet.site, "SITE_A");
        assert_eq!(packet.asset, "PUMP01");
        assert_eq!(packet.point, "DE");
        assert_eq!(packet.rpm, Some(1800.0));
        assert_eq!(packet.acceleration.len(), 3);
    }

    #[test]
    fn malformed_json_is_an_ingest_error() {
        let err = parse_sample_packet("vibration/raw/s/a/p", "{not json").unwrap_err();
        assert!(matches!(err, IngestError::Malformed(_)));
    }
}
