//! Plain-text, UTF-8 round-trip serialization for a [`ContourCollection`]
//! (spec §6): `contour_collection { ... contour { ... } ... }` blocks, with
//! metadata values carried as base64 so embedded newlines/braces are safe.

use crate::contour::{Contour, ContourCollection};
use crate::error::{CoreError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dicomaton_world::Vec3;
use std::fmt::Write as _;

fn encode_metadata(key: &str, value: &str, out: &mut String, indent: &str) {
    let _ = writeln!(out, "{indent}metadata {key} {}", BASE64.encode(value));
}

fn write_contour(contour: &Contour, out: &mut String) {
    out.push_str("  contour {\n");
    let _ = writeln!(out, "    closed {}", contour.is_closed());
    for p in contour.points() {
        let _ = writeln!(out, "    vertex {} {} {}", p.x, p.y, p.z);
    }
    for (k, v) in contour.metadata() {
        encode_metadata(k, v, out, "    ");
    }
    out.push_str("  }\n");
}

/// Serializes `collection` to the plain-text round-trip format.
pub fn serialize(collection: &ContourCollection) -> String {
    let mut out = String::new();
    out.push_str("contour_collection {\n");
    for (k, v) in collection.metadata() {
        encode_metadata(k, v, &mut out, "  ");
    }
    for contour in collection.contours() {
        write_contour(contour, &mut out);
    }
    out.push_str("}\n");
    out
}

/// Parses the plain-text round-trip format back into a [`ContourCollection`].
///
/// # Errors
/// Returns [`CoreError::InvalidArgument`] on any structural malformation
/// (unbalanced braces, non-numeric vertex fields, invalid base64).
pub fn deserialize(text: &str) -> Result<ContourCollection> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let header = lines
        .next()
        .ok_or_else(|| CoreError::InvalidArgument("empty input".into()))?;
    if header != "contour_collection {" {
        return Err(CoreError::InvalidArgument(
            "expected 'contour_collection {' header".into(),
        ));
    }

    let mut collection = ContourCollection::default();
    let mut current: Option<(Vec<Vec3>, bool, Vec<(String, String)>)> = None;

    for line in lines {
        if line == "}" {
            if let Some((points, closed, metadata)) = current.take() {
                let mut contour = Contour::new(points, closed);
                for (k, v) in metadata {
                    contour.metadata_set(k, v);
                }
                collection.contours_mut().push(contour);
            }
            continue;
        }
        if line == "contour {" {
            current = Some((Vec::new(), false, Vec::new()));
            continue;
        }
        if let Some((points, closed, metadata)) = current.as_mut() {
            if let Some(rest) = line.strip_prefix("vertex ") {
                let mut fields = rest.split_whitespace();
                let parse = |f: Option<&str>| -> Result<f64> {
                    f.and_then(|s| s.parse::<f64>().ok())
                        .ok_or_else(|| CoreError::InvalidArgument(format!("malformed vertex line: '{line}'")))
                };
                let x = parse(fields.next())?;
                let y = parse(fields.next())?;
                let z = parse(fields.next())?;
                points.push(Vec3::new(x, y, z));
            } else if let Some(rest) = line.strip_prefix("closed ") {
                *closed = rest
                    .parse::<bool>()
                    .map_err(|_| CoreError::InvalidArgument(format!("malformed closed line: '{line}'")))?;
            } else if let Some(rest) = line.strip_prefix("metadata ") {
                let (key, encoded) = rest
                    .split_once(' ')
                    .ok_or_else(|| CoreError::InvalidArgument(format!("malformed metadata line: '{line}'")))?;
                let decoded = BASE64
                    .decode(encoded)
                    .map_err(|e| CoreError::InvalidArgument(format!("invalid base64 metadata value: {e}")))?;
                let value = String::from_utf8(decoded)
                    .map_err(|e| CoreError::InvalidArgument(format!("metadata value is not UTF-8: {e}")))?;
                metadata.push((key.to_string(), value));
            } else {
                return Err(CoreError::InvalidArgument(format!("unrecognized line: '{line}'")));
            }
        } else if let Some(rest) = line.strip_prefix("metadata ") {
            let (key, encoded) = rest
                .split_once(' ')
                .ok_or_else(|| CoreError::InvalidArgument(format!("malformed metadata line: '{line}'")))?;
            let decoded = BASE64
                .decode(encoded)
                .map_err(|e| CoreError::InvalidArgument(format!("invalid base64 metadata value: {e}")))?;
            let value = String::from_utf8(decoded)
                .map_err(|e| CoreError::InvalidArgument(format!("metadata value is not UTF-8: {e}")))?;
            collection.metadata_set(key, value);
        } else {
            return Err(CoreError::InvalidArgument(format!("unexpected line outside any block: '{line}'")));
        }
    }

    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContourCollection {
        let mut contour = Contour::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            true,
        );
        contour.metadata_set("ROIName", "PTV\nwith a newline");
        let mut collection = ContourCollection::new(vec![contour]);
        collection.metadata_set("Modality", "RTSTRUCT");
        collection
    }

    #[test]
    fn round_trips_points_and_metadata_with_embedded_newline() {
        let original = sample();
        let text = serialize(&original);
        let restored = deserialize(&text).unwrap();

        assert_eq!(restored.contours().len(), 1);
        assert_eq!(restored.contours()[0].points(), original.contours()[0].points());
        assert_eq!(
            restored.contours()[0].metadata_get("ROIName"),
            Some("PTV\nwith a newline")
        );
        assert_eq!(restored.metadata_get("Modality"), Some("RTSTRUCT"));
    }

    #[test]
    fn rejects_missing_header() {
        let result = deserialize("not the right header\n");
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }
}
