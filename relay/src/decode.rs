//! Pure frame decoding for both ingest ports. No sockets, no state:
//! bytes in, update out, so every branch is testable on its own.

use serde_json::Value;
use telemetry_shared::{FieldMap, SensorGroup};
use thiserror::Error;

pub const STM32_PREFIX: &str = "STM32:";
pub const BMP180_PREFIX: &str = "BMP180:";
const ACCIDENT_PHRASE: &str = "ACCIDENT DETECTED";

/// Why a frame was dropped instead of decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("frame is not UTF-8")]
    NotUtf8,
    #[error("empty frame")]
    EmptyFrame,
    #[error("separator line")]
    Separator,
    #[error("malformed {kind} line: {reason}")]
    Malformed {
        kind: &'static str,
        reason: &'static str,
    },
    #[error("unparseable JSON payload: {0}")]
    UnparseableJson(String),
    #[error("unrecognized payload")]
    Unrecognized,
}

/// One decoded sensor reading, before conversion to a field map.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorUpdate {
    Accident { detected: bool },
    Accel { x: f64, y: f64, z: f64 },
    Gyro { x: f64, y: f64, z: f64 },
    Fields(FieldMap),
}

impl SensorUpdate {
    /// Field map this update merges into its group. Axis readings nest
    /// under their instrument name, accident events set one flag.
    pub fn into_fields(self) -> FieldMap {
        match self {
            SensorUpdate::Accident { detected } => {
                let mut fields = FieldMap::new();
                fields.insert("ACCIDENT_DETECTED".to_string(), Value::Bool(detected));
                fields
            }
            SensorUpdate::Accel { x, y, z } => axis_fields("Accel", x, y, z),
            SensorUpdate::Gyro { x, y, z } => axis_fields("Gyro", x, y, z),
            SensorUpdate::Fields(fields) => fields,
        }
    }
}

fn axis_fields(name: &str, x: f64, y: f64, z: f64) -> FieldMap {
    let mut axes = FieldMap::new();
    axes.insert("X".to_string(), Value::from(x));
    axes.insert("Y".to_string(), Value::from(y));
    axes.insert("Z".to_string(), Value::from(z));
    let mut fields = FieldMap::new();
    fields.insert(name.to_string(), Value::Object(axes));
    fields
}

/// Fields an STM32 update merges. Normal readings carry an explicit
/// `ACCIDENT_DETECTED: false` so the flag clears once regular frames resume.
pub fn stm32_merge_fields(update: SensorUpdate) -> FieldMap {
    let accident = matches!(update, SensorUpdate::Accident { .. });
    let mut fields = update.into_fields();
    if !accident {
        fields.insert("ACCIDENT_DETECTED".to_string(), Value::Bool(false));
    }
    fields
}

/// Decode one datagram from the combined port, where STM32 text frames
/// and BMP180 JSON frames are told apart by their line prefix.
pub fn decode_dual_port(raw: &[u8]) -> Result<(SensorGroup, SensorUpdate), Rejected> {
    let text = std::str::from_utf8(raw).map_err(|_| Rejected::NotUtf8)?;
    let line = text.trim();
    if let Some(content) = line.strip_prefix(STM32_PREFIX) {
        Ok((SensorGroup::Stm32, decode_stm32(content.trim())?))
    } else if let Some(content) = line.strip_prefix(BMP180_PREFIX) {
        Ok((SensorGroup::Bmp180, decode_json_object(content.trim())?))
    } else {
        Err(Rejected::Unrecognized)
    }
}

/// Decode one datagram from the motor channel port: a bare JSON object.
pub fn decode_ch_port(raw: &[u8]) -> Result<SensorUpdate, Rejected> {
    let text = std::str::from_utf8(raw).map_err(|_| Rejected::NotUtf8)?;
    decode_json_object(text.trim())
}

fn decode_stm32(content: &str) -> Result<SensorUpdate, Rejected> {
    if content.is_empty() {
        return Err(Rejected::EmptyFrame);
    }
    // Accident lines are dashes around the phrase. Check before the
    // separator rule so they are never mistaken for a plain divider.
    if is_accident_line(content) {
        return Ok(SensorUpdate::Accident { detected: true });
    }
    if is_separator_line(content) {
        return Err(Rejected::Separator);
    }
    if let Some(rest) = content.strip_prefix("Accel:") {
        let [x, y, z] = parse_axes(rest, "Accel", "g")?;
        return Ok(SensorUpdate::Accel { x, y, z });
    }
    if let Some(rest) = content.strip_prefix("Gyro:") {
        let [x, y, z] = parse_axes(rest, "Gyro", "/s")?;
        return Ok(SensorUpdate::Gyro { x, y, z });
    }
    Err(Rejected::Unrecognized)
}

fn is_accident_line(line: &str) -> bool {
    line.starts_with('-') && line.ends_with('-') && line.trim_matches('-') == ACCIDENT_PHRASE
}

fn is_separator_line(line: &str) -> bool {
    line.len() >= 3 && line.bytes().all(|b| b == b'-')
}

/// Parse an `X=.., Y=.., Z=..` tail with a per-instrument unit suffix.
/// Exactly three comma-separated fields; values are taken positionally.
fn parse_axes(rest: &str, kind: &'static str, unit: &str) -> Result<[f64; 3], Rejected> {
    let parts: Vec<&str> = rest.split(',').collect();
    if parts.len() != 3 {
        return Err(Rejected::Malformed {
            kind,
            reason: "expected 3 comma-separated axis fields",
        });
    }
    let mut values = [0.0f64; 3];
    for (slot, part) in values.iter_mut().zip(&parts) {
        let (_axis, value) = part.split_once('=').ok_or(Rejected::Malformed {
            kind,
            reason: "axis field has no '='",
        })?;
        let value = value.trim();
        let value = value.strip_suffix(unit).unwrap_or(value).trim();
        let parsed: f64 = value.parse().map_err(|_| Rejected::Malformed {
            kind,
            reason: "axis value is not a number",
        })?;
        if !parsed.is_finite() {
            return Err(Rejected::Malformed {
                kind,
                reason: "axis value is not finite",
            });
        }
        *slot = parsed;
    }
    Ok(values)
}

fn decode_json_object(content: &str) -> Result<SensorUpdate, Rejected> {
    match serde_json::from_str::<FieldMap>(content) {
        Ok(fields) => Ok(SensorUpdate::Fields(fields)),
        Err(err) => Err(Rejected::UnparseableJson(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_stm32_frame(line: &str) -> Result<SensorUpdate, Rejected> {
        match decode_dual_port(line.as_bytes()) {
            Ok((group, update)) => {
                assert_eq!(group, SensorGroup::Stm32);
                Ok(update)
            }
            Err(err) => Err(err),
        }
    }

    #[test]
    fn accel_line_decodes_positionally() {
        let update = decode_stm32_frame("STM32:Accel: X=0.37g, Y=0.06g, Z=-1.95g").unwrap();
        assert_eq!(
            update,
            SensorUpdate::Accel {
                x: 0.37,
                y: 0.06,
                z: -1.95
            }
        );
    }

    #[test]
    fn gyro_line_strips_the_rate_suffix() {
        let update = decode_stm32_frame("STM32:Gyro: X=-3.74/s, Y=0.38/s, Z=-0.89/s").unwrap();
        assert_eq!(
            update,
            SensorUpdate::Gyro {
                x: -3.74,
                y: 0.38,
                z: -0.89
            }
        );
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let update = decode_stm32_frame("  STM32: Accel: X= 1.00 g, Y=2.00g , Z=3.00g \r\n");
        assert_eq!(
            update.unwrap(),
            SensorUpdate::Accel {
                x: 1.0,
                y: 2.0,
                z: 3.0
            }
        );
    }

    #[test]
    fn accident_line_sets_the_flag_and_nothing_else() {
        let update =
            decode_stm32_frame("STM32:----------ACCIDENT DETECTED----------").unwrap();
        assert_eq!(update, SensorUpdate::Accident { detected: true });

        let fields = stm32_merge_fields(update);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["ACCIDENT_DETECTED"], Value::Bool(true));
    }

    #[test]
    fn accident_wins_over_the_separator_rule() {
        // Dashes on both sides must not be read as a divider line.
        let update = decode_stm32_frame("STM32:---ACCIDENT DETECTED---").unwrap();
        assert!(matches!(update, SensorUpdate::Accident { detected: true }));
    }

    #[test]
    fn separator_lines_are_dropped() {
        assert_eq!(
            decode_stm32_frame("STM32:--------------------"),
            Err(Rejected::Separator)
        );
        assert_eq!(decode_stm32_frame("STM32:-----"), Err(Rejected::Separator));
        assert_eq!(decode_stm32_frame("STM32:---"), Err(Rejected::Separator));
    }

    #[test]
    fn short_dash_runs_are_not_separators() {
        assert_eq!(decode_stm32_frame("STM32:--"), Err(Rejected::Unrecognized));
    }

    #[test]
    fn empty_stm32_payload_is_rejected() {
        assert_eq!(decode_stm32_frame("STM32:"), Err(Rejected::EmptyFrame));
        assert_eq!(decode_stm32_frame("STM32:   "), Err(Rejected::EmptyFrame));
    }

    #[test]
    fn wrong_axis_count_is_rejected() {
        assert!(matches!(
            decode_stm32_frame("STM32:Accel: X=0.1g, Y=0.2g"),
            Err(Rejected::Malformed { kind: "Accel", .. })
        ));
        assert!(matches!(
            decode_stm32_frame("STM32:Gyro: X=1/s, Y=2/s, Z=3/s, W=4/s"),
            Err(Rejected::Malformed { kind: "Gyro", .. })
        ));
    }

    #[test]
    fn missing_equals_is_rejected() {
        assert!(matches!(
            decode_stm32_frame("STM32:Accel: X 0.1g, Y=0.2g, Z=0.3g"),
            Err(Rejected::Malformed { .. })
        ));
    }

    #[test]
    fn non_numeric_axis_is_rejected() {
        assert!(matches!(
            decode_stm32_frame("STM32:Accel: X=?.??g, Y=0.2g, Z=0.3g"),
            Err(Rejected::Malformed { .. })
        ));
        assert!(matches!(
            decode_stm32_frame("STM32:Gyro: X=nan/s, Y=0/s, Z=0/s"),
            Err(Rejected::Malformed { .. })
        ));
    }

    #[test]
    fn unknown_stm32_line_is_rejected() {
        assert_eq!(
            decode_stm32_frame("STM32:Temp: 24C"),
            Err(Rejected::Unrecognized)
        );
    }

    #[test]
    fn bmp180_json_passes_through() {
        let frame = br#"BMP180:{"temp": 24.6, "pressure": 1007.2, "altitude": 48.3}"#;
        let (group, update) = decode_dual_port(frame).unwrap();
        assert_eq!(group, SensorGroup::Bmp180);
        let fields = update.into_fields();
        assert_eq!(fields["temp"], json!(24.6));
        assert_eq!(fields["pressure"], json!(1007.2));
        assert_eq!(fields["altitude"], json!(48.3));
    }

    #[test]
    fn broken_bmp180_json_is_rejected() {
        let err = decode_dual_port(br#"BMP180:{"temp": 24."#).unwrap_err();
        assert!(matches!(err, Rejected::UnparseableJson(_)));
    }

    #[test]
    fn non_object_json_is_rejected() {
        for frame in [
            &b"BMP180:[1, 2, 3]"[..],
            &b"BMP180:42"[..],
            &b"BMP180:\"temp\""[..],
            &b"BMP180:null"[..],
        ] {
            assert!(
                matches!(decode_dual_port(frame), Err(Rejected::UnparseableJson(_))),
                "accepted {:?}",
                String::from_utf8_lossy(frame)
            );
        }
    }

    #[test]
    fn unknown_prefix_is_rejected() {
        assert_eq!(
            decode_dual_port(b"DHT22:{\"h\": 40}"),
            Err(Rejected::Unrecognized)
        );
        assert_eq!(
            decode_dual_port(b"just some noise"),
            Err(Rejected::Unrecognized)
        );
    }

    #[test]
    fn non_utf8_frames_are_rejected() {
        assert_eq!(decode_dual_port(&[0xff, 0xfe, 0x80]), Err(Rejected::NotUtf8));
        assert_eq!(decode_ch_port(&[0xc3, 0x28]), Err(Rejected::NotUtf8));
    }

    #[test]
    fn ch_port_takes_bare_json_objects() {
        let update = decode_ch_port(br#"{"TEMP": 31.2, "VIB": 0.02, "RPM": 2400}"#).unwrap();
        let fields = update.into_fields();
        assert_eq!(fields["TEMP"], json!(31.2));
        assert_eq!(fields["VIB"], json!(0.02));
        assert_eq!(fields["RPM"], json!(2400));
    }

    #[test]
    fn ch_port_rejects_non_objects() {
        assert!(matches!(
            decode_ch_port(b"[1, 2]"),
            Err(Rejected::UnparseableJson(_))
        ));
        assert!(matches!(
            decode_ch_port(b"not json"),
            Err(Rejected::UnparseableJson(_))
        ));
    }

    #[test]
    fn axis_updates_nest_under_their_instrument() {
        let fields = SensorUpdate::Accel {
            x: 0.37,
            y: 0.06,
            z: -1.95,
        }
        .into_fields();
        assert_eq!(
            Value::Object(fields),
            json!({"Accel": {"X": 0.37, "Y": 0.06, "Z": -1.95}})
        );
    }

    #[test]
    fn normal_readings_clear_the_accident_flag() {
        let fields = stm32_merge_fields(SensorUpdate::Gyro {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        });
        assert_eq!(fields["ACCIDENT_DETECTED"], Value::Bool(false));
        assert!(fields.contains_key("Gyro"));

        let fields = stm32_merge_fields(SensorUpdate::Accident { detected: true });
        assert_eq!(fields["ACCIDENT_DETECTED"], Value::Bool(true));
    }
}
