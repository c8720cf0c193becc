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

use crate::errors::ProxyError;

/// An ordered `(lon, lat)` pair, the unit coordinate of every endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn as_pair(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// An ordered, non-empty sequence of points. Order is semantically
/// significant: it participates in the fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationList(pub Vec<Point>);

impl LocationList {
    pub fn as_slice(&self) -> &[Point] {
        &self.0
    }
}

/// Parses `"lon,lat"`, trimming whitespace around each field. Rejects
/// anything that isn't exactly two comma-separated numeric fields.
pub fn parse_point(raw: &str) -> Result<Point, ProxyError> {
    let parts: Vec<&str> = raw.split(',').map(|chunk| chunk.trim()).collect();
    if parts.len() != 2 {
        return Err(ProxyError::Parse(
            "Координаты должны быть в формате lon,lat".into(),
        ));
    }

    let lon: f64 = parts[0]
        .parse()
        .map_err(|_| ProxyError::Parse("Координаты должны быть в формате lon,lat".into()))?;
    let lat: f64 = parts[1]
        .parse()
        .map_err(|_| ProxyError::Parse("Координаты должны быть в формате lon,lat".into()))?;

    if !lon.is_finite() || !lat.is_finite() {
        return Err(ProxyError::Parse(
            "Координаты должны быть в формате lon,lat".into(),
        ));
    }

    Ok(Point { lon, lat })
}

/// Parses `"lon,lat;lon,lat;..."`, falling back to `|` as the separator
/// when `;` is absent. Requires at least two points.
pub fn parse_locations(raw: &str) -> Result<LocationList, ProxyError> {
    let chunks: Vec<&str> = if raw.contains(';') {
        raw.split(';').collect()
    } else if raw.contains('|') {
        raw.split('|').collect()
    } else {
        vec![raw]
    };

    let mut points = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        points.push(parse_point(chunk)?);
    }

    if points.len() < 2 {
        return Err(ProxyError::Parse(
            "Координаты должны быть в формате lon,lat;lon2,lat2;...".into(),
        ));
    }

    Ok(LocationList(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_point() {
        let p = parse_point("30.70,46.39").unwrap();
        assert_eq!(p.lon, 30.70);
        assert_eq!(p.lat, 46.39);
    }

    #[test]
    fn whitespace_around_fields_is_ignored() {
        let a = parse_point("1.0,2.0").unwrap();
        let b = parse_point(" 1.0 , 2.0 ").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(parse_point("1.0,2.0,3.0").is_err());
        assert!(parse_point("1.0").is_err());
    }

    #[test]
    fn rejects_non_numeric_fields() {
        assert!(parse_point("abc,2.0").is_err());
    }

    #[test]
    fn parses_semicolon_separated_locations() {
        let list = parse_locations("30.70,46.39;30.71,46.42").unwrap();
        assert_eq!(list.0.len(), 2);
    }

    #[test]
    fn falls_back_to_pipe_separator_when_no_semicolon() {
        let with_semi = parse_locations("30.70,46.39;30.71,46.42").unwrap();
        let with_pipe = parse_locations("30.70,46.39|30.71,46.42").unwrap();
        assert_eq!(with_semi, with_pipe);
    }

    #[test]
    fn prefers_semicolon_when_both_present() {
        // A '|' inside one coordinate field should never be treated as a
        // separator once ';' is present.
        let list = parse_locations("30.70,46.39;30.71,46.42").unwrap();
        assert_eq!(list.0[0].lon, 30.70);
        assert_eq!(list.0[1].lon, 30.71);
    }

    #[test]
    fn single_point_is_rejected_for_locations() {
        assert!(parse_locations("30.70,46.39").is_err());
    }

    #[test]
    fn malformed_point_in_list_fails_whole_parse() {
        assert!(parse_locations("30.70,46.39;not-a-point").is_err());
    }
}
