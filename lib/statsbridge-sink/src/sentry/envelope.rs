use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::Dsn;

#[derive(Serialize)]
struct EnvelopeHeader {
    event_id: String,
    sent_at: String,
    dsn: String,
}

#[derive(Serialize)]
struct ItemHeader {
    r#type: &'static str,
    length: usize,
}

/// Builds an envelope holding a single `statsd` item.
///
/// The envelope is three newline-separated parts: the envelope header, the item header, and the payload itself.
pub(super) fn statsd_envelope(
    dsn: &Dsn, payload: &[u8], event_id: Uuid, sent_at: DateTime<Utc>,
) -> Result<Vec<u8>, serde_json::Error> {
    let header = EnvelopeHeader {
        event_id: event_id.simple().to_string(),
        sent_at: sent_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        dsn: dsn.to_string(),
    };
    let item_header = ItemHeader {
        r#type: "statsd",
        length: payload.len(),
    };

    let mut envelope = serde_json::to_vec(&header)?;
    envelope.push(b'\n');
    serde_json::to_writer(&mut envelope, &item_header)?;
    envelope.push(b'\n');
    envelope.extend_from_slice(payload);

    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn frames_statsd_item() {
        let dsn = Dsn::parse("https://public@sentry.example.com/42").unwrap();
        let event_id = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        let sent_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let payload = b"cpu_usage:42|g|#job:api|T1000\nreqs:1|c||T1000";

        let envelope = statsd_envelope(&dsn, payload, event_id, sent_at).unwrap();
        let envelope = String::from_utf8(envelope).unwrap();
        let mut parts = envelope.splitn(3, '\n');

        assert_eq!(
            parts.next().unwrap(),
            r#"{"event_id":"0123456789abcdef0123456789abcdef","sent_at":"2024-05-01T12:00:00.000Z","dsn":"https://public@sentry.example.com/42"}"#
        );
        assert_eq!(parts.next().unwrap(), r#"{"type":"statsd","length":45}"#);
        assert_eq!(parts.next().unwrap().as_bytes(), payload);
    }
}
