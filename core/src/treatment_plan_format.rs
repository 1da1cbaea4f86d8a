//! Plain-text, UTF-8 round-trip serialization for a [`TreatmentPlan`] (spec
//! §6): `treatment_plan { dynamic_state { static_state { ... } ... } ... }`
//! blocks, mirroring the contour-collection format's brace structure and
//! base64-encoded metadata.

use crate::error::{CoreError, Result};
use crate::payload::{DynamicState, StaticState, TreatmentPlan};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fmt::Write as _;

fn encode_metadata(key: &str, value: &str, out: &mut String, indent: &str) {
    let _ = writeln!(out, "{indent}metadata {key} {}", BASE64.encode(value));
}

fn decode_metadata(line: &str) -> Result<(String, String)> {
    let rest = line
        .strip_prefix("metadata ")
        .ok_or_else(|| CoreError::InvalidArgument(format!("malformed metadata line: '{line}'")))?;
    let (key, encoded) = rest
        .split_once(' ')
        .ok_or_else(|| CoreError::InvalidArgument(format!("malformed metadata line: '{line}'")))?;
    let decoded = BASE64
        .decode(encoded)
        .map_err(|e| CoreError::InvalidArgument(format!("invalid base64 metadata value: {e}")))?;
    let value = String::from_utf8(decoded)
        .map_err(|e| CoreError::InvalidArgument(format!("metadata value is not UTF-8: {e}")))?;
    Ok((key.to_string(), value))
}

/// Serializes `plan` to the plain-text round-trip format.
pub fn serialize(plan: &TreatmentPlan) -> String {
    let mut out = String::new();
    out.push_str("treatment_plan {\n");
    for (k, v) in &plan.metadata {
        encode_metadata(k, v, &mut out, "  ");
    }
    for ds in &plan.dynamic_states {
        out.push_str("  dynamic_state {\n");
        for ss in &ds.static_states {
            out.push_str("    static_state {\n");
            let _ = writeln!(out, "      cumulative_meterset_weight {}", ss.cumulative_meterset_weight);
            for (k, v) in &ss.metadata {
                encode_metadata(k, v, &mut out, "      ");
            }
            out.push_str("    }\n");
        }
        out.push_str("  }\n");
    }
    out.push_str("}\n");
    out
}

/// Parses the plain-text round-trip format back into a [`TreatmentPlan`].
///
/// # Errors
/// Returns [`CoreError::InvalidArgument`] on structural malformation, and
/// rejects a dynamic state whose static states are not strictly monotonic in
/// cumulative meterset weight.
pub fn deserialize(text: &str) -> Result<TreatmentPlan> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let header = lines
        .next()
        .ok_or_else(|| CoreError::InvalidArgument("empty input".into()))?;
    if header != "treatment_plan {" {
        return Err(CoreError::InvalidArgument("expected 'treatment_plan {' header".into()));
    }

    let mut plan = TreatmentPlan::default();
    let mut current_ds: Option<DynamicState> = None;
    let mut current_ss: Option<StaticState> = None;

    for line in lines {
        if line == "static_state {" {
            current_ss = Some(StaticState { cumulative_meterset_weight: f64::NAN, metadata: Default::default() });
            continue;
        }
        if let Some(ss) = current_ss.as_mut() {
            if line == "}" {
                if ss.cumulative_meterset_weight.is_nan() {
                    return Err(CoreError::InvalidArgument("static_state missing cumulative_meterset_weight".into()));
                }
                let ss = current_ss.take().unwrap();
                let ds = current_ds
                    .as_mut()
                    .ok_or_else(|| CoreError::InvalidArgument("static_state outside any dynamic_state".into()))?;
                if let Some(prev) = ds.static_states.last() {
                    if ss.cumulative_meterset_weight <= prev.cumulative_meterset_weight {
                        return Err(CoreError::InvalidArgument(
                            "cumulative_meterset_weight must strictly increase within a dynamic_state".into(),
                        ));
                    }
                }
                ds.static_states.push(ss);
                continue;
            }
            if let Some(rest) = line.strip_prefix("cumulative_meterset_weight ") {
                ss.cumulative_meterset_weight = rest
                    .parse()
                    .map_err(|_| CoreError::InvalidArgument(format!("malformed cumulative_meterset_weight: '{line}'")))?;
            } else if line.starts_with("metadata ") {
                let (k, v) = decode_metadata(line)?;
                ss.metadata.insert(k, v);
            } else {
                return Err(CoreError::InvalidArgument(format!("unrecognized line inside static_state: '{line}'")));
            }
            continue;
        }
        if line == "dynamic_state {" {
            current_ds = Some(DynamicState::default());
            continue;
        }
        if line == "}" {
            if let Some(ds) = current_ds.take() {
                plan.dynamic_states.push(ds);
            }
            continue;
        }
        if current_ds.is_some() {
            return Err(CoreError::InvalidArgument(format!("unrecognized line inside dynamic_state: '{line}'")));
        }
        if line.starts_with("metadata ") {
            let (k, v) = decode_metadata(line)?;
            plan.metadata.insert(k, v);
        } else {
            return Err(CoreError::InvalidArgument(format!("unexpected line outside any block: '{line}'")));
        }
    }

    Ok(plan)
}
