use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    trail::{TrailV1, TrailV2},
    types::{ActivityType, DeviceInfo, Reading, Waypoint},
};

use super::ValidationError;

static V1_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Fa-f0-9]+$").expect("valid regex"));
static V2_UUID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-F0-9]{16}$").expect("valid regex"));

type Object = Map<String, Value>;

/// Validates a version 1 record.
pub fn validate_v1(t: &Object) -> Result<TrailV1, ValidationError> {
    let id = string_field(t, "id")?;
    if !V1_ID.is_match(id) {
        return Err(ValidationError::BadIdentifier("id"));
    }
    let device = string_field(t, "device")?.to_string();
    let (start, end) = time_span(t)?;
    let distance = distance(t)?;
    let waypoints = match t.get("waypoints") {
        None | Some(Value::Null) => Vec::new(),
        Some(ws) => waypoints(ws)?,
    };
    let readings = readings(t.get("readings"), false)?;

    Ok(TrailV1 {
        id: id.to_string(),
        device,
        start,
        end,
        distance,
        waypoints,
        readings,
    })
}

/// Validates a version 2 record.
pub fn validate_v2(t: &Object) -> Result<TrailV2, ValidationError> {
    let uuid = string_field(t, "uuid")?;
    if !V2_UUID.is_match(uuid) {
        return Err(ValidationError::BadIdentifier("uuid"));
    }
    let device = device(t.get("device"))?;
    let (start, end) = time_span(t)?;
    let distance = distance(t)?;
    let ty = string_field(t, "type")?;
    let activity = ActivityType::from_wire(ty)
        .ok_or_else(|| ValidationError::BadActivityType(ty.to_string()))?;
    let waypoints = waypoints(t.get("waypoints").ok_or(ValidationError::BadField("waypoints"))?)?;
    let readings = readings(t.get("readings"), true)?;

    Ok(TrailV2 {
        uuid: uuid.to_string(),
        device,
        start,
        end,
        distance,
        activity,
        waypoints,
        readings,
    })
}

/// Returns the value as an integer when it is a finite, whole, non-negative number.
pub fn non_negative_integer(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    let x = finite(v)?;
    (x >= 0.0 && x.fract() == 0.0 && x <= u64::MAX as f64).then_some(x as u64)
}

/// Elements of an array-like value with no holes.
///
/// JSON arrays are dense by construction. Objects are accepted when they carry
/// an integral `length` and every key `"0"..length`.
pub fn dense_elements(v: &Value) -> Option<Vec<&Value>> {
    match v {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(obj) => {
            let len = obj.get("length").and_then(non_negative_integer)?;
            let len = usize::try_from(len).ok()?;
            if len > obj.len() {
                return None;
            }
            (0..len).map(|i| obj.get(&i.to_string())).collect()
        }
        _ => None,
    }
}

fn finite(v: &Value) -> Option<f64> {
    v.as_f64().filter(|x| x.is_finite())
}

// Both coordinates share the [-90, 90] bound on every wire version so far.
fn coordinate(v: &Value) -> Option<f64> {
    finite(v).filter(|x| (-90.0..=90.0).contains(x))
}

fn string_field<'a>(t: &'a Object, field: &'static str) -> Result<&'a str, ValidationError> {
    t.get(field)
        .and_then(Value::as_str)
        .ok_or(ValidationError::BadField(field))
}

fn time_span(t: &Object) -> Result<(f64, f64), ValidationError> {
    let start = t.get("start").and_then(finite);
    let end = t.get("end").and_then(finite);
    match (start, end) {
        (Some(start), Some(end)) if 0.0 <= start && start <= end => Ok((start, end)),
        _ => Err(ValidationError::BadTimeSpan),
    }
}

fn distance(t: &Object) -> Result<f64, ValidationError> {
    t.get("distance")
        .and_then(finite)
        .filter(|d| *d >= 0.0)
        .ok_or(ValidationError::BadDistance)
}

fn device(v: Option<&Value>) -> Result<DeviceInfo, ValidationError> {
    let obj = v
        .and_then(Value::as_object)
        .ok_or(ValidationError::BadField("device"))?;
    let field = |name: &'static str| {
        obj.get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ValidationError::BadField("device"))
    };
    Ok(DeviceInfo {
        name: field("name")?,
        hardware: field("hardware")?,
        os: field("os")?,
        ua: field("ua")?,
    })
}

fn waypoints(v: &Value) -> Result<Vec<Waypoint>, ValidationError> {
    let items = dense_elements(v).ok_or(ValidationError::NotDense("waypoints"))?;
    items
        .into_iter()
        .enumerate()
        .map(|(i, w)| waypoint(w).ok_or(ValidationError::BadWaypoint(i)))
        .collect()
}

fn waypoint(v: &Value) -> Option<Waypoint> {
    let obj = v.as_object()?;
    let name = obj.get("name")?.as_str().filter(|n| !n.is_empty())?;
    Some(Waypoint {
        name: name.to_string(),
        lat: coordinate(obj.get("lat")?)?,
        lon: coordinate(obj.get("lon")?)?,
    })
}

fn readings(v: Option<&Value>, timed: bool) -> Result<Vec<Reading>, ValidationError> {
    let items = v
        .and_then(dense_elements)
        .ok_or(ValidationError::NotDense("readings"))?;
    items
        .into_iter()
        .enumerate()
        .map(|(index, r)| {
            reading(r, timed).map_err(|reason| ValidationError::BadReading { index, reason })
        })
        .collect()
}

fn reading(v: &Value, timed: bool) -> Result<Reading, &'static str> {
    let parts = dense_elements(v).ok_or("not a dense array")?;
    if parts.len() < 2 {
        return Err("fewer than two elements");
    }
    let lat = coordinate(parts[0]).ok_or("latitude out of range")?;
    let lon = coordinate(parts[1]).ok_or("longitude out of range")?;
    if !timed {
        return Ok(Reading::new(lat, lon));
    }
    let elapsed = parts.get(2).ok_or("missing elapsed time")?;
    let elapsed = finite(elapsed)
        .filter(|e| *e >= 0.0)
        .ok_or("elapsed time must be finite and non-negative")?;
    Ok(Reading::timed(lat, lon, elapsed))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn dense_elements_accepts_array_like_objects() {
        let v = json!({"length": 2, "0": 1.0, "1": 2.0});
        assert_eq!(dense_elements(&v).map(|xs| xs.len()), Some(2));
    }

    #[test]
    fn dense_elements_rejects_holes_and_bad_lengths() {
        assert!(dense_elements(&json!({"length": 2, "0": 1.0, "2": 2.0})).is_none());
        assert!(dense_elements(&json!({"length": 1.5, "0": 1.0})).is_none());
        assert!(dense_elements(&json!({"length": -1})).is_none());
        assert!(dense_elements(&json!("not an array")).is_none());
    }

    #[test]
    fn non_negative_integer_accepts_whole_floats() {
        assert_eq!(non_negative_integer(&json!(2)), Some(2));
        assert_eq!(non_negative_integer(&json!(2.0)), Some(2));
        assert_eq!(non_negative_integer(&json!(2.5)), None);
        assert_eq!(non_negative_integer(&json!(-1)), None);
        assert_eq!(non_negative_integer(&json!("1")), None);
    }
}
