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

use serde_json::{Map, Value};
use sha1::{Digest, Sha1};

/// Recursively sorts every JSON object's keys so two semantically
/// identical values always serialize to the same bytes, regardless of
/// the order they were built in. This is the canonicalizer the fingerprint
/// contract depends on — never rely on a general-purpose serializer's
/// default key order here.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, Value> =
                std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Produces `"<namespace>:<hex>"` where `<hex>` is the SHA-1 digest of the
/// canonical JSON form of `descriptor`. Determinism across runs, machines,
/// and implementations is required: this hash is the public contract that
/// lets heterogeneous replicas share a cache.
pub fn fingerprint(namespace: &str, descriptor: Value) -> String {
    let canonical = canonicalize(descriptor);
    let bytes = serde_json::to_vec(&canonical).expect("canonical JSON always serializes");

    let mut hasher = Sha1::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();

    format!("{namespace}:{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_descriptor_produces_same_fingerprint() {
        let a = fingerprint("route", json!({"profile": "driving-car", "start": [1.0, 2.0], "end": [3.0, 4.0]}));
        let b = fingerprint("route", json!({"end": [3.0, 4.0], "start": [1.0, 2.0], "profile": "driving-car"}));
        assert_eq!(a, b, "key order must not affect the fingerprint");
    }

    #[test]
    fn different_descriptors_produce_different_fingerprints() {
        let a = fingerprint("route", json!({"profile": "driving-car"}));
        let b = fingerprint("route", json!({"profile": "cycling-regular"}));
        assert_ne!(a, b);
    }

    #[test]
    fn namespace_is_part_of_the_key() {
        let a = fingerprint("route", json!({"q": "Odesa"}));
        let b = fingerprint("geocode", json!({"q": "Odesa"}));
        assert_ne!(a, b);
        assert!(a.starts_with("route:"));
        assert!(b.starts_with("geocode:"));
    }

    #[test]
    fn nested_object_keys_are_sorted_too() {
        let a = fingerprint("table", json!({"locations": [{"b": 1, "a": 2}]}));
        let b = fingerprint("table", json!({"locations": [{"a": 2, "b": 1}]}));
        assert_eq!(a, b);
    }

    #[test]
    fn hex_digest_is_forty_characters() {
        let fp = fingerprint("geocode", json!({"q": "Odesa"}));
        let hex = fp.split(':').nth(1).unwrap();
        assert_eq!(hex.len(), 40);
    }
}
