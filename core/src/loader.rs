//! The ingress contract (spec §6): a loader recognises some of a list of
//! filesystem paths, consumes them into a [`Drover`], and leaves the rest for
//! the next loader in a priority-ordered chain.

use crate::drover::Drover;
use crate::error::{CoreError, Result};
use crate::operation::{FilenameLex, InvocationMetadata};

/// One stage of a loader chain. `try_load` scans `paths`, consumes every path
/// it recognises (seeding `metadata` per file as appropriate), and removes
/// those paths from the list so later loaders in the chain never see them.
/// A path this loader doesn't recognise is left untouched, not an error.
pub trait Loader<T> {
    /// # Errors
    /// Returns an error if a path this loader *does* recognise fails to load.
    fn try_load(
        &self,
        drover: &mut Drover<T>,
        metadata: &mut InvocationMetadata,
        lex: &FilenameLex,
        paths: &mut Vec<String>,
    ) -> Result<()>;
}

/// Runs `paths` through `chain` in priority order: each loader only sees the
/// paths previous loaders left behind.
pub fn run_chain<T>(
    chain: &[&dyn Loader<T>],
    drover: &mut Drover<T>,
    metadata: &mut InvocationMetadata,
    lex: &FilenameLex,
    paths: &mut Vec<String>,
) -> Result<()> {
    for loader in chain {
        loader.try_load(drover, metadata, lex, paths)?;
    }
    Ok(())
}

/// Recognises the plain-text contour-collection format (spec §6's one fully
/// round-trippable file format) by its `.contours` extension.
pub struct TextContourLoader;

impl<T: Copy + Into<f64> + From<f64>> Loader<T> for TextContourLoader {
    fn try_load(
        &self,
        drover: &mut Drover<T>,
        metadata: &mut InvocationMetadata,
        _lex: &FilenameLex,
        paths: &mut Vec<String>,
    ) -> Result<()> {
        let mut unrecognised = Vec::new();
        for path in paths.drain(..) {
            if !path.ends_with(".contours") {
                unrecognised.push(path);
                continue;
            }
            let text = std::fs::read_to_string(&path)
                .map_err(|e| CoreError::IoError(format!("{path}: {e}")))?;
            let collection = crate::text_format::deserialize(&text)?;
            drover.ensure_contour_data_allocated().borrow_mut().push(collection);
            metadata.write("LoadedContourFile", path);
        }
        *paths = unrecognised;
        Ok(())
    }
}

/// Recognises the tabular-DVH plain-text format by its `.dvh` extension,
/// producing one [`LineSample`](crate::payload::LineSample) per structure
/// histogram block.
pub struct TabularDvhLoader;

impl<T: Copy + Into<f64> + From<f64>> Loader<T> for TabularDvhLoader {
    fn try_load(
        &self,
        drover: &mut Drover<T>,
        metadata: &mut InvocationMetadata,
        _lex: &FilenameLex,
        paths: &mut Vec<String>,
    ) -> Result<()> {
        let mut unrecognised = Vec::new();
        for path in paths.drain(..) {
            if !path.ends_with(".dvh") {
                unrecognised.push(path);
                continue;
            }
            let bytes = std::fs::read(&path).map_err(|e| CoreError::IoError(format!("{path}: {e}")))?;
            for sample in crate::dvh::parse(&bytes)? {
                drover.push_line_sample(sample);
            }
            metadata.write("LoadedDVHFile", path);
        }
        *paths = unrecognised;
        Ok(())
    }
}

/// Recognises the treatment-plan plain-text format by its `.plan` extension.
pub struct TreatmentPlanLoader;

impl<T: Copy + Into<f64> + From<f64>> Loader<T> for TreatmentPlanLoader {
    fn try_load(
        &self,
        drover: &mut Drover<T>,
        metadata: &mut InvocationMetadata,
        _lex: &FilenameLex,
        paths: &mut Vec<String>,
    ) -> Result<()> {
        let mut unrecognised = Vec::new();
        for path in paths.drain(..) {
            if !path.ends_with(".plan") {
                unrecognised.push(path);
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|e| CoreError::IoError(format!("{path}: {e}")))?;
            let plan = crate::treatment_plan_format::deserialize(&text)?;
            drover.push_treatment_plan(plan);
            metadata.write("LoadedTreatmentPlanFile", path);
        }
        *paths = unrecognised;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::{Contour, ContourCollection};
    use dicomaton_world::Vec3;
    use std::io::Write;

    fn write_temp_contours_file(contents: &str) -> String {
        let mut path = std::env::temp_dir();
        path.push(format!("loader-test-{:p}.contours", contents.as_ptr()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn text_contour_loader_consumes_recognised_paths_and_leaves_the_rest() {
        let collection = ContourCollection::new(vec![Contour::new(
            vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            true,
        )]);
        let text = crate::text_format::serialize(&collection);
        let path = write_temp_contours_file(&text);

        let mut drover: Drover<f64> = Drover::new();
        let mut metadata = InvocationMetadata::default();
        let lex = FilenameLex::default();
        let mut paths = vec![path.clone(), "unrelated.dcm".to_string()];

        let loader = TextContourLoader;
        loader.try_load(&mut drover, &mut metadata, &lex, &mut paths).unwrap();

        assert_eq!(paths, vec!["unrelated.dcm".to_string()]);
        assert!(drover.has_contour_data());
        assert_eq!(metadata.get("LoadedContourFile"), Some(path.as_str()));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn tabular_dvh_loader_consumes_dvh_paths_and_leaves_the_rest() {
        let text = concat!(
            "Type : Cumulative Dose Volume Histogram\n",
            "\n",
            "Total dose [cGy] : 7000\n",
            "\n",
            "Structure : PTV\n",
            "Volume [cm³] : 1.0\n",
            "\n",
            "Dose [cGy] Relative dose [%] Structure Volume [cm³]\n",
            "0 0 1.0\n",
            "7000 100 0.0\n",
            "\n",
        );
        let mut path = std::env::temp_dir();
        path.push(format!("loader-test-{:p}.dvh", text.as_ptr()));
        std::fs::write(&path, text).unwrap();
        let path = path.to_string_lossy().into_owned();

        let mut drover: Drover<f64> = Drover::new();
        let mut metadata = InvocationMetadata::default();
        let lex = FilenameLex::default();
        let mut paths = vec![path.clone(), "unrelated.dcm".to_string()];

        TabularDvhLoader.try_load(&mut drover, &mut metadata, &lex, &mut paths).unwrap();

        assert_eq!(paths, vec!["unrelated.dcm".to_string()]);
        assert!(drover.has_lsamp_data());
        assert_eq!(metadata.get("LoadedDVHFile"), Some(path.as_str()));

        std::fs::remove_file(&path).ok();
    }
}
