// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::Path;

use kdam::TqdmIterator;

use crate::coco::{CocoAnnotation, CocoDataset, Info, LabelRegistry};
use crate::convert::{CancelFlag, ImageIdPolicy, check_cancelled, emit_image};
use crate::error::SorrelError;
use crate::ex::line;
use crate::im::resolve_image;
use crate::ut::path::create_output_directory;
use crate::ut::track::{progress_bar, progress_log, thousands_format};

/// Convert a line-record box listing into a COCO bundle
///
/// One record per image: `path count x1 y1 x2 y2 label [x1 y1 ...]`, with
/// corner coordinates in absolute pixel units. Unreadable images and rows
/// too malformed to name an image are logged and skipped; degenerate box
/// geometry and unresolvable folder labels abort the job since they mark
/// annotation data the caller must fix.
///
/// # Examples
///
/// ```no_run
/// use sorrel::coco::LabelRegistry;
/// use sorrel::convert::LineRecordConverter;
/// use sorrel::ut::records::read_delimited_file;
///
/// let registry = LabelRegistry::new(["bg", "capsicum", "rockmelon"]).unwrap();
///
/// let (records, _) = read_delimited_file("train.txt", ' ', false).unwrap();
///
/// let converter = LineRecordConverter::new(registry);
/// let dataset = converter
///     .run(&records, "out/annotations.json".as_ref(), "out/images".as_ref())
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct LineRecordConverter {
    pub registry: LabelRegistry,
    pub info: Info,
    pub id_policy: ImageIdPolicy,
    pub resize: f32,
    pub label_from_folder: bool,
    pub composite_filename: bool,
    pub verbose: bool,
    pub cancel: Option<CancelFlag>,
}

impl LineRecordConverter {
    /// Initialize a converter with default options
    ///
    /// # Arguments
    ///
    /// * `registry` - The job's label vocabulary
    pub fn new(registry: LabelRegistry) -> Self {
        Self {
            registry,
            info: Info::default(),
            id_policy: ImageIdPolicy::default(),
            resize: 1.0,
            label_from_folder: false,
            composite_filename: false,
            verbose: false,
            cancel: None,
        }
    }

    /// Run the conversion job over parsed annotation records
    ///
    /// # Arguments
    ///
    /// * `records` - Tokenized rows from the annotation listing
    /// * `output_json` - Destination path for the bundle JSON
    /// * `output_images` - Destination directory for converted images
    pub fn run(
        &self,
        records: &[Vec<String>],
        output_json: &Path,
        output_images: &Path,
    ) -> Result<CocoDataset, SorrelError> {
        let output_images = create_output_directory(output_images)?;

        let mut dataset = CocoDataset::new(self.info.clone(), self.registry.categories());
        let mut annotation_id: u32 = 1;
        let mut skipped: usize = 0;

        let pb = progress_bar(records.len(), "Converting box records", self.verbose);

        for (index, row) in records.iter().enumerate().tqdm_with_bar(pb) {
            check_cancelled(self.cancel.as_ref())?;

            let Some((image_ref, count)) = parse_row_head(row) else {
                progress_log(&format!("Skipping malformed record {}", index), self.verbose);
                skipped += 1;
                continue;
            };

            let file_name = Path::new(image_ref)
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| image_ref.to_string());

            let image_id = self.id_policy.image_id(index, &file_name)?;

            let resolved =
                resolve_image(image_ref, image_id, self.resize, self.composite_filename);

            let (record, image) = match resolved {
                Ok(resolved) => resolved,
                Err(_) => {
                    progress_log(&format!("Cannot open {}", image_ref), self.verbose);
                    skipped += 1;
                    continue;
                }
            };

            let destination = output_images.join(&record.file_name);
            if emit_image(Path::new(image_ref), &image, &destination, self.resize != 1.0).is_err()
            {
                progress_log(&format!("Cannot copy {}", image_ref), self.verbose);
                skipped += 1;
                continue;
            }

            let boxes = self.image_boxes(row, count, record.id, &mut annotation_id)?;

            dataset.images.push(record);
            dataset.annotations.extend(boxes);
        }

        if self.verbose {
            println!()
        }

        dataset.save(output_json)?;

        progress_log(
            &format!(
                "Complete. {} images converted with {} annotations. {} records skipped.",
                thousands_format(dataset.images.len()),
                thousands_format(dataset.annotations.len()),
                thousands_format(skipped)
            ),
            self.verbose,
        );

        Ok(dataset)
    }

    /// Extract every box of one record, threading the job-wide id counter
    fn image_boxes(
        &self,
        row: &[String],
        count: usize,
        image_id: u32,
        annotation_id: &mut u32,
    ) -> Result<Vec<CocoAnnotation>, SorrelError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let payload = &row[2..];

        if payload.is_empty() || payload.len() % count != 0 || payload.len() / count < 4 {
            return Err(SorrelError::RecordError(format!(
                "{} boxes cannot be read from {} tokens",
                count,
                payload.len()
            )));
        }

        let category_override = if self.label_from_folder {
            Some(line::category_from_folder(&row[0], &self.registry)?)
        } else {
            None
        };

        let mut boxes = Vec::with_capacity(count);

        for chunk in payload.chunks(payload.len() / count) {
            let annotation =
                line::from_tokens(chunk, self.resize, category_override, image_id, *annotation_id)?;

            *annotation_id += 1;
            boxes.push(annotation);
        }

        Ok(boxes)
    }
}

fn parse_row_head(row: &[String]) -> Option<(&str, usize)> {
    if row.len() < 2 {
        return None;
    }

    let count = row[1].parse::<usize>().ok()?;

    Some((row[0].as_str(), count))
}

#[cfg(test)]
mod test {

    use super::*;
    use image::RgbImage;
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sorrel_lines_{}_{}", tag, std::process::id()));
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn row(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn registry() -> LabelRegistry {
        LabelRegistry::new(["bg", "weed"]).unwrap()
    }

    #[test]
    fn test_convert_ids_monotonic_across_images() {
        let dir = scratch_dir("monotonic");

        let image_a = dir.join("field_1.png");
        let image_b = dir.join("field_2.png");
        RgbImage::new(64, 64).save(&image_a).unwrap();
        RgbImage::new(64, 64).save(&image_b).unwrap();

        let records = vec![
            row(&[
                &image_a.to_string_lossy(),
                "2",
                "10",
                "10",
                "50",
                "50",
                "2",
                "1",
                "1",
                "5",
                "5",
                "1",
            ]),
            row(&[&image_b.to_string_lossy(), "1", "3", "3", "9", "9", "2"]),
        ];

        let converter = LineRecordConverter::new(registry());
        let dataset = converter
            .run(
                &records,
                &dir.join("annotations.json"),
                &dir.join("images"),
            )
            .unwrap();

        assert_eq!(dataset.images.len(), 2);
        assert_eq!(dataset.annotations.len(), 3);

        let ids: Vec<u32> = dataset.annotations.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(dataset.annotations[0].bbox, [10.0, 10.0, 41.0, 41.0]);
        assert_eq!(dataset.annotations[0].area, 1681.0);
        assert_eq!(dataset.annotations[0].category_id, 2);

        assert!(dir.join("images").join("field_1.png").exists());
        assert!(dir.join("images").join("field_2.png").exists());
        assert!(dir.join("annotations.json").exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_unreadable_image_skipped() {
        let dir = scratch_dir("skip");

        let records = vec![row(&["missing.png", "1", "10", "10", "50", "50", "2"])];

        let converter = LineRecordConverter::new(registry());
        let dataset = converter
            .run(
                &records,
                &dir.join("annotations.json"),
                &dir.join("images"),
            )
            .unwrap();

        assert!(dataset.images.is_empty());
        assert!(dataset.annotations.is_empty());
        assert_eq!(dataset.categories.len(), 2);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_degenerate_box_aborts_job() {
        let dir = scratch_dir("abort");

        let image = dir.join("plot_1.png");
        RgbImage::new(64, 64).save(&image).unwrap();

        let records = vec![row(&[
            &image.to_string_lossy(),
            "1",
            "50",
            "10",
            "50",
            "50",
            "2",
        ])];

        let converter = LineRecordConverter::new(registry());
        let converted = converter.run(
            &records,
            &dir.join("annotations.json"),
            &dir.join("images"),
        );

        assert!(matches!(converted, Err(SorrelError::BoxError(_))));
        assert!(!dir.join("annotations.json").exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_cancelled_job_writes_nothing() {
        let dir = scratch_dir("cancel");

        let image = dir.join("plot_1.png");
        RgbImage::new(16, 16).save(&image).unwrap();

        let records = vec![row(&[
            &image.to_string_lossy(),
            "1",
            "1",
            "1",
            "5",
            "5",
            "2",
        ])];

        let cancel = CancelFlag::new();
        cancel.cancel();

        let mut converter = LineRecordConverter::new(registry());
        converter.cancel = Some(cancel);

        let converted = converter.run(
            &records,
            &dir.join("annotations.json"),
            &dir.join("images"),
        );

        assert!(matches!(converted, Err(SorrelError::JobCancelled)));
        assert!(!dir.join("annotations.json").exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_label_from_folder() {
        let dir = scratch_dir("folder");

        std::fs::create_dir_all(dir.join("weed/TRAIN_RGB")).unwrap();
        let image = dir.join("weed/TRAIN_RGB/plot_1.png");
        RgbImage::new(32, 32).save(&image).unwrap();

        let records = vec![row(&[
            &image.to_string_lossy(),
            "1",
            "1",
            "1",
            "5",
            "5",
        ])];

        let mut converter = LineRecordConverter::new(registry());
        converter.label_from_folder = true;

        let dataset = converter
            .run(
                &records,
                &dir.join("annotations.json"),
                &dir.join("images"),
            )
            .unwrap();

        assert_eq!(dataset.annotations[0].category_id, 2);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
