//! The tabular-DVH plain-text ingest format (spec §6): patient/plan/structure
//! metadata blocks followed by a two- or three-column dose-volume table, one
//! [`LineSample`] per structure block. Grounded on the vendor-exported format
//! a major linac's planning software emits.

use crate::error::{CoreError, Result};
use crate::payload::LineSample;
use std::collections::HashMap;

/// Strips a leading UTF-8 BOM and validates the remainder as UTF-8. A UTF-16
/// or UTF-32 BOM is rejected before UTF-8 validation is even attempted: this
/// format is defined over UTF-8 text only, and those encodings would not
/// generally decode as UTF-8 in the first place.
fn consume_bom(bytes: &[u8]) -> Result<&str> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return std::str::from_utf8(&bytes[3..])
            .map_err(|e| CoreError::UnsupportedEncoding(format!("not valid utf-8: {e}")));
    }
    if bytes.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) || bytes.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
        return Err(CoreError::UnsupportedEncoding("utf-32 BOM detected; only utf-8 is supported".into()));
    }
    if bytes.starts_with(&[0xFE, 0xFF]) || bytes.starts_with(&[0xFF, 0xFE]) {
        return Err(CoreError::UnsupportedEncoding("utf-16 BOM detected; only utf-8 is supported".into()));
    }
    std::str::from_utf8(bytes).map_err(|e| CoreError::UnsupportedEncoding(format!("not valid utf-8: {e}")))
}

/// A metadata block: `Key : Value` lines, continued by subsequent
/// whitespace-leading lines with no colon, terminated by a blank line.
/// Returns the raw header keys alongside the line count consumed so the
/// caller can advance past the block (including its terminating blank line).
fn parse_header_block<'a>(lines: &mut std::iter::Peekable<std::str::Lines<'a>>) -> Result<HashMap<String, String>> {
    let mut raw = HashMap::new();
    let mut previous_key: Option<String> = None;

    while let Some(line) = lines.peek().copied() {
        let trimmed = line.trim_end_matches('\r');
        if trimmed.trim().is_empty() {
            lines.next();
            break;
        }
        lines.next();

        let starts_with_space = trimmed.starts_with(' ');
        match trimmed.find(':') {
            Some(colon) if !starts_with_space => {
                let key = trimmed[..colon].trim().to_string();
                let value = trimmed[colon + 1..].trim().to_string();
                if !key.is_empty() && !value.is_empty() {
                    raw.insert(key.clone(), value);
                    previous_key = Some(key);
                }
            }
            None if starts_with_space => {
                let key = previous_key
                    .as_ref()
                    .ok_or_else(|| CoreError::InvalidArgument("value continuation without a preceding key".into()))?;
                let value = trimmed.trim();
                if !value.is_empty() {
                    raw.entry(key.clone()).and_modify(|v| {
                        v.push(' ');
                        v.push_str(value);
                    });
                }
            }
            _ => return Err(CoreError::InvalidArgument(format!("key-value structure not understood: '{trimmed}'"))),
        }
    }
    Ok(raw)
}

/// Renames a header block's raw keys onto the driver's metadata keys, scaling
/// cGy to Gy and cm³ to mm³ on the way in, overwriting entries the way each
/// successive block in the file overwrites the metadata that came before it.
fn translate_header(raw: &HashMap<String, String>, metadata: &mut HashMap<String, String>) -> Result<()> {
    let parse_f64 = |v: &str| -> Result<f64> {
        v.parse::<f64>().map_err(|_| CoreError::InvalidArgument(format!("expected a number, found '{v}'")))
    };

    for (key, val) in raw {
        match key.as_str() {
            "Patient Name" => {
                metadata.insert("PatientsName".into(), val.clone());
            }
            "Patient ID" => {
                metadata.insert("PatientID".into(), val.clone());
            }
            "Comment" => {
                metadata.insert("TabularDVHComment".into(), val.clone());
            }
            "Date" => {
                metadata.insert("InstanceCreationDateTime".into(), val.clone());
            }
            "Exported by" => {
                metadata.insert("OperatorsName".into(), val.clone());
            }
            "Description" => {
                metadata.insert("TabularDVHDescription".into(), val.clone());
            }
            "Type" => {
                metadata.insert("Modality".into(), "Histogram".into());
                let kind = match val.as_str() {
                    "Cumulative Dose Volume Histogram" => "Cumulative",
                    "Differential Dose Volume Histogram" => "Differential",
                    other => return Err(CoreError::InvalidArgument(format!("histogram type not recognized: '{other}'"))),
                };
                metadata.insert("HistogramType".into(), kind.into());
            }
            "Plan" | "Uncertainty plan" => {
                metadata.insert("RTPlanLabel".into(), val.clone());
                metadata.insert("RTPlanName".into(), val.clone());
            }
            "Course" => {
                metadata.insert("StudyID".into(), val.clone());
            }
            "Plan Status" => {
                metadata.insert("RTPlanApprovalStatus".into(), val.clone());
            }
            "Total dose [cGy]" => {
                metadata.insert("TabularDVHReferenceDose".into(), (parse_f64(val)? / 100.0).to_string());
            }
            "% for dose (%)" => {
                metadata.insert("TabularDVHReferenceDoseNormalization".into(), (parse_f64(val)? / 100.0).to_string());
            }
            "Structure" => {
                metadata.insert("LineName".into(), val.clone());
                metadata.insert("ROIName".into(), val.clone());
                metadata.insert("NormalizedROIName".into(), val.clone());
            }
            "Volume [cm³]" => {
                metadata.insert("ROIVolume".into(), (parse_f64(val)? * 1000.0).to_string());
            }
            "Min Dose [cGy]" => {
                metadata.insert("DistributionMin".into(), (parse_f64(val)? / 100.0).to_string());
            }
            "Mean Dose [cGy]" => {
                metadata.insert("DistributionMean".into(), (parse_f64(val)? / 100.0).to_string());
            }
            "Max Dose [cGy]" => {
                metadata.insert("DistributionMax".into(), (parse_f64(val)? / 100.0).to_string());
            }
            "Min Dose [%]" | "Mean Dose [%]" | "Max Dose [%]" => {
                let reference = metadata
                    .get("TabularDVHReferenceDose")
                    .ok_or_else(|| CoreError::InvalidArgument(format!("'{key}' given before 'Total dose [cGy]'")))?;
                let d_ref = parse_f64(reference)?;
                let dose = d_ref * parse_f64(val)? / 100.0;
                let target = match key.as_str() {
                    "Min Dose [%]" => "DistributionMin",
                    "Mean Dose [%]" => "DistributionMean",
                    _ => "DistributionMax",
                };
                metadata.insert(target.into(), dose.to_string());
            }
            _ => {}
        }
    }
    Ok(())
}

enum VolumeUnits {
    RatioPercent,
    CubicCentimetres,
}

/// Reads the column-header line and table rows following a structure's
/// metadata block, scaling dose to Gy and volume to mm³.
fn parse_histogram_table<'a>(
    lines: &mut std::iter::Peekable<std::str::Lines<'a>>,
    metadata: &HashMap<String, String>,
) -> Result<Vec<(f64, f64)>> {
    let header = lines
        .next()
        .ok_or_else(|| CoreError::InvalidArgument("unable to find histogram block".into()))?
        .trim_end_matches('\r');
    if header.trim().is_empty() {
        return Err(CoreError::InvalidArgument("unable to find histogram block".into()));
    }
    let columns: Vec<&str> = header.split(']').map(str::trim).filter(|c| !c.is_empty()).collect();
    if columns.len() != 3 {
        return Err(CoreError::InvalidArgument("unexpected number of columns in histogram block".into()));
    }

    let mut dose_col = None;
    let mut volume_col = None;
    let mut volume_units = None;
    for (i, column) in columns.iter().enumerate() {
        let label = format!("{column}]");
        match label.as_str() {
            "Dose [cGy]" => dose_col = Some(i),
            "Ratio of Total Structure Volume [%]" => {
                volume_col = Some(i);
                volume_units = Some(VolumeUnits::RatioPercent);
            }
            "Structure Volume [cm³]" => {
                volume_col = Some(i);
                volume_units = Some(VolumeUnits::CubicCentimetres);
            }
            "Relative dose [%]" => {}
            other => return Err(CoreError::InvalidArgument(format!("column name not recognized: '{other}'"))),
        }
    }
    let dose_col = dose_col.ok_or_else(|| CoreError::InvalidArgument("unable to identify absolute dose column".into()))?;
    let volume_col = volume_col.ok_or_else(|| CoreError::InvalidArgument("unable to identify volume column".into()))?;
    let volume_units = volume_units.expect("set alongside volume_col");

    let volume_scale = match volume_units {
        VolumeUnits::CubicCentimetres => 1000.0,
        VolumeUnits::RatioPercent => {
            let roi_volume_mm3: f64 = metadata
                .get("ROIVolume")
                .ok_or_else(|| CoreError::InvalidArgument("relative volume column requires a preceding 'Volume [cm³]' header".into()))?
                .parse()
                .map_err(|_| CoreError::InvalidArgument("malformed ROIVolume metadata".into()))?;
            roi_volume_mm3 / 100.0
        }
    };

    let mut samples = Vec::new();
    while let Some(line) = lines.peek().copied() {
        let trimmed = line.trim_end_matches('\r').trim();
        if trimmed.is_empty() {
            lines.next();
            break;
        }
        lines.next();
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() != 3 {
            return Err(CoreError::InvalidArgument(format!("unexpected number of columns in histogram row: '{trimmed}'")));
        }
        let parse = |s: &str| -> Result<f64> {
            s.parse::<f64>().map_err(|_| CoreError::InvalidArgument(format!("expected a number, found '{s}'")))
        };
        let dose_gy = parse(tokens[dose_col])? / 100.0;
        let volume_mm3 = parse(tokens[volume_col])? * volume_scale;
        samples.push((dose_gy, volume_mm3));
    }

    if samples.is_empty() {
        return Err(CoreError::InvalidArgument("histogram contained no data".into()));
    }
    Ok(samples)
}

/// Parses a tabular-DVH file's full text into one [`LineSample`] per
/// structure block: a top-level patient block, a plan block, then repeated
/// `(structure header, histogram table)` pairs. Each later block's metadata
/// overwrites the keys the earlier blocks set, matching the source format's
/// per-structure metadata carry-forward.
pub fn parse(bytes: &[u8]) -> Result<Vec<LineSample>> {
    let text = consume_bom(bytes)?;
    let mut lines = text.lines().peekable();

    let mut metadata = HashMap::new();
    translate_header(&parse_header_block(&mut lines)?, &mut metadata)?;
    translate_header(&parse_header_block(&mut lines)?, &mut metadata)?;

    let mut out = Vec::new();
    while lines.peek().is_some() {
        translate_header(&parse_header_block(&mut lines)?, &mut metadata)?;
        let samples = parse_histogram_table(&mut lines, &metadata)?;
        out.push(LineSample { samples, metadata: metadata.clone() });
    }

    if out.is_empty() {
        return Err(CoreError::InvalidArgument("file contained no structure histograms".into()));
    }
    Ok(out)
}

/// Re-emits a tabular-DVH-compatible text block for one structure's line
/// sample, in absolute cGy/cm³ units, for round-trip testing.
pub fn serialize_structure(name: &str, roi_volume_mm3: f64, sample: &LineSample) -> String {
    let mut out = String::new();
    out.push_str(&format!("Structure : {name}\n"));
    out.push_str(&format!("Volume [cm³] : {}\n", roi_volume_mm3 / 1000.0));
    out.push('\n');
    out.push_str("Dose [cGy] Relative dose [%] Structure Volume [cm³]\n");
    for (dose_gy, volume_mm3) in &sample.samples {
        out.push_str(&format!("{} 0 {}\n", dose_gy * 100.0, volume_mm3 / 1000.0));
    }
    out.push('\n');
    out
}
