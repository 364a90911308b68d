use bytes::Bytes;
use restconf_tree::Notification;
use serde_json::json;
use time::macros::format_description;

use super::StreamFault;
use crate::codec::json;
use crate::compliance::ComplianceOptions;

/// Renders one Server-Sent Events frame: `data: <json>\n\n`.
///
/// Unless the notification wrapper is disabled the payload is enclosed in
/// `ietf-restconf:notification` with an `eventTime` carrying a numeric UTC
/// offset.
///
/// # Errors
///
/// Returns [`StreamFault::Encode`] when the event cannot be read or
/// formatted.
pub fn render_event(
    notification: &Notification,
    compliance: ComplianceOptions,
) -> Result<Bytes, StreamFault> {
    let event = json::encode(
        notification.event.as_ref(),
        !compliance.qualify_namespace_disabled,
    )
    .map_err(|error| StreamFault::encode(error.to_string()))?;

    let payload = if compliance.disable_notification_wrapper {
        event
    } else {
        let event_time = notification
            .event_time
            .format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
            ))
            .map_err(|error| StreamFault::encode(error.to_string()))?;
        json!({
            "ietf-restconf:notification": {
                "eventTime": event_time,
                "event": event,
            }
        })
    };

    let mut frame = b"data: ".to_vec();
    serde_json::to_writer(&mut frame, &payload)
        .map_err(|error| StreamFault::encode(error.to_string()))?;
    frame.extend_from_slice(b"\n\n");
    Ok(Bytes::from(frame))
}
