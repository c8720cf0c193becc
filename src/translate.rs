// Copyright (C) 2025 Matías Salinas (support@fenden.com)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde_json::{json, Value};

use crate::points::LocationList;

/// Maps an OSRM-style profile name to the provider's profile, passing
/// anything unrecognised through unchanged.
pub fn map_osrm_profile(profile: &str) -> String {
    match profile {
        "driving" | "driving-car" => "driving-car",
        "cycling" | "cycling-regular" => "cycling-regular",
        "walking" | "foot" | "foot-walking" => "foot-walking",
        other => return other.to_string(),
    }
    .to_string()
}

/// Translates a provider directions response into an OSRM-like body. If the
/// provider returned no routes, produces the synthetic `NoRoute` body (which
/// the caller should still cache — the miss is stable). `locations` mirrors
/// the request's own points into the `waypoints` field.
pub fn translate_route_v1(upstream_json: &Value, locations: &LocationList) -> String {
    // Already-translated responses (our own prior output, fed back in) pass
    // through unchanged rather than being re-derived from zero.
    if upstream_json.get("code").and_then(Value::as_str).is_some() {
        return upstream_json.to_string();
    }

    let routes = upstream_json.get("routes").and_then(Value::as_array);

    let route = match routes.and_then(|r| r.first()) {
        Some(route) => route,
        None => return json!({"code": "NoRoute", "routes": []}).to_string(),
    };

    let direct = match (
        route.get("distance").and_then(Value::as_f64),
        route.get("duration").and_then(Value::as_f64),
    ) {
        (Some(d), Some(t)) => Some((d, t)),
        _ => None,
    };

    let from_summary = route.get("summary").and_then(|summary| {
        match (
            summary.get("distance").and_then(Value::as_f64),
            summary.get("duration").and_then(Value::as_f64),
        ) {
            (Some(d), Some(t)) => Some((d, t)),
            _ => None,
        }
    });

    let (distance, duration) = direct.or(from_summary).unwrap_or_else(|| {
        let segments = route.get("segments").and_then(Value::as_array);
        let (mut d, mut t) = (0.0, 0.0);
        if let Some(segments) = segments {
            for segment in segments {
                d += segment.get("distance").and_then(Value::as_f64).unwrap_or(0.0);
                t += segment.get("duration").and_then(Value::as_f64).unwrap_or(0.0);
            }
        }
        (d, t)
    });

    let geometry = route.get("geometry").cloned().unwrap_or(Value::Null);

    let waypoints: Vec<Value> = locations
        .as_slice()
        .iter()
        .map(|p| json!({"location": [p.lon, p.lat], "name": ""}))
        .collect();

    json!({
        "code": "Ok",
        "routes": [{"distance": distance, "duration": duration, "geometry": geometry}],
        "waypoints": waypoints,
    })
    .to_string()
}

/// Translates a provider geocoding response into a Nominatim-like body,
/// falling back to the raw upstream body when `features` is absent, empty,
/// or malformed. The fallback is still cacheable.
pub fn translate_search(upstream_body: &str) -> String {
    let parsed: Value = match serde_json::from_str(upstream_body) {
        Ok(v) => v,
        Err(_) => return upstream_body.to_string(),
    };

    let feature = match parsed.get("features").and_then(Value::as_array).and_then(|f| f.first()) {
        Some(f) => f,
        None => return upstream_body.to_string(),
    };

    let coords = match feature
        .get("geometry")
        .and_then(|g| g.get("coordinates"))
        .and_then(Value::as_array)
    {
        Some(c) if c.len() >= 2 => c,
        _ => return upstream_body.to_string(),
    };

    let lon = match coords[0].as_f64() {
        Some(v) => v,
        None => return upstream_body.to_string(),
    };
    let lat = match coords[1].as_f64() {
        Some(v) => v,
        None => return upstream_body.to_string(),
    };

    let properties = feature.get("properties").cloned().unwrap_or(Value::Null);
    let display_name = ["label", "name", "locality", "region"]
        .iter()
        .find_map(|field| properties.get(field).and_then(Value::as_str))
        .unwrap_or("")
        .to_string();

    json!([{
        "lat": lat.to_string(),
        "lon": lon.to_string(),
        "display_name": display_name,
        "properties": properties,
    }])
    .to_string()
}
