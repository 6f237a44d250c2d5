// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::Path;

use kdam::TqdmIterator;

use crate::coco::{CocoDataset, Info, LabelRegistry};
use crate::constant;
use crate::convert::{CancelFlag, ImageIdPolicy, check_cancelled, emit_image};
use crate::error::SorrelError;
use crate::ex::mask;
use crate::im::{ColorMask, resolve_image};
use crate::ut::path::{collect_file_paths, collect_file_pairs, create_output_directory};
use crate::ut::track::{progress_bar, progress_log, thousands_format};

/// How same-colored regions of a mask become annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// All islands of one color merge into a single annotation whose
    /// bounding box spans every island
    Merged,
    /// Every island becomes its own annotation
    Instances,
}

/// Convert paired source and mask images into a COCO bundle
///
/// Source images and colored instance masks are matched by file stem;
/// every distinct non-black mask color is traced into polygon
/// segmentations for one category. Unreadable images or masks are logged
/// and skipped along with their annotations.
///
/// # Examples
///
/// ```no_run
/// use sorrel::coco::LabelRegistry;
/// use sorrel::convert::{MaskConverter, MaskMode};
///
/// let registry = LabelRegistry::new(["plant"]).unwrap();
///
/// let mut converter = MaskConverter::new(registry, "plant");
/// converter.mode = MaskMode::Instances;
/// converter.mask_substring = Some("_mask".to_string());
///
/// let dataset = converter
///     .run(
///         "dataset/images".as_ref(),
///         "dataset/masks".as_ref(),
///         "out/annotations.json".as_ref(),
///         "out/images".as_ref(),
///     )
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct MaskConverter {
    pub registry: LabelRegistry,
    pub category: String,
    pub mode: MaskMode,
    pub iscrowd: u32,
    pub info: Info,
    pub id_policy: ImageIdPolicy,
    pub image_substring: Option<String>,
    pub mask_substring: Option<String>,
    pub verbose: bool,
    pub cancel: Option<CancelFlag>,
}

impl MaskConverter {
    /// Initialize a converter with default options
    ///
    /// # Arguments
    ///
    /// * `registry` - The job's label vocabulary
    /// * `category` - The vocabulary label every traced region belongs to
    pub fn new(registry: LabelRegistry, category: &str) -> Self {
        Self {
            registry,
            category: category.to_string(),
            mode: MaskMode::Instances,
            iscrowd: 0,
            info: Info::default(),
            id_policy: ImageIdPolicy::default(),
            image_substring: None,
            mask_substring: None,
            verbose: false,
            cancel: None,
        }
    }

    /// Run the conversion job over paired image and mask directories
    ///
    /// # Arguments
    ///
    /// * `image_dir` - Directory of source images
    /// * `mask_dir` - Directory of colored instance masks
    /// * `output_json` - Destination path for the bundle JSON
    /// * `output_images` - Destination directory for converted images
    pub fn run(
        &self,
        image_dir: &Path,
        mask_dir: &Path,
        output_json: &Path,
        output_images: &Path,
    ) -> Result<CocoDataset, SorrelError> {
        let category_id = self.registry.get(&self.category).ok_or_else(|| {
            SorrelError::LabelError(format!(
                "{} is not in the job vocabulary",
                self.category
            ))
        })?;

        let images = collect_file_paths(
            image_dir.to_string_lossy().to_string(),
            constant::SUPPORTED_IMAGE_FORMATS.as_slice(),
            self.image_substring.clone(),
        )?;

        let masks = collect_file_paths(
            mask_dir.to_string_lossy().to_string(),
            constant::SUPPORTED_IMAGE_FORMATS.as_slice(),
            self.mask_substring.clone(),
        )?;

        let pairs = collect_file_pairs(
            &images,
            &masks,
            self.image_substring.clone(),
            self.mask_substring.clone(),
        );

        let output_images = create_output_directory(output_images)?;

        let mut dataset = CocoDataset::new(self.info.clone(), self.registry.categories());
        let mut annotation_id: u32 = 1;
        let mut skipped: usize = 0;

        let pb = progress_bar(pairs.len(), "Converting masks", self.verbose);

        for (index, (_, image_path, mask_path)) in pairs.iter().enumerate().tqdm_with_bar(pb) {
            check_cancelled(self.cancel.as_ref())?;

            let file_name = image_path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();

            let image_id = self.id_policy.image_id(index, &file_name)?;

            let (record, image) = match resolve_image(image_path, image_id, 1.0, false) {
                Ok(resolved) => resolved,
                Err(_) => {
                    progress_log(
                        &format!("Cannot open {}", image_path.display()),
                        self.verbose,
                    );
                    skipped += 1;
                    continue;
                }
            };

            let color_mask = match ColorMask::open(mask_path) {
                Ok(color_mask) => color_mask,
                Err(_) => {
                    progress_log(
                        &format!("Cannot open mask {}", mask_path.display()),
                        self.verbose,
                    );
                    skipped += 1;
                    continue;
                }
            };

            let destination = output_images.join(&record.file_name);
            if emit_image(image_path, &image, &destination, false).is_err() {
                progress_log(
                    &format!("Cannot copy {}", image_path.display()),
                    self.verbose,
                );
                skipped += 1;
                continue;
            }

            for sub_mask in color_mask.sub_masks() {
                match self.mode {
                    MaskMode::Merged => {
                        let merged = mask::merged_annotation(
                            &sub_mask,
                            record.id,
                            category_id,
                            annotation_id,
                            self.iscrowd,
                        );

                        if let Some(annotation) = merged {
                            dataset.annotations.push(annotation);
                            annotation_id += 1;
                        }
                    }
                    MaskMode::Instances => {
                        let annotations = mask::instance_annotations(
                            &sub_mask,
                            record.id,
                            category_id,
                            annotation_id,
                            self.iscrowd,
                        );

                        annotation_id += annotations.len() as u32;
                        dataset.annotations.extend(annotations);
                    }
                }
            }

            dataset.images.push(record);
        }

        if self.verbose {
            println!()
        }

        dataset.save(output_json)?;

        progress_log(
            &format!(
                "Complete. {} images converted with {} annotations. {} pairs skipped.",
                thousands_format(dataset.images.len()),
                thousands_format(dataset.annotations.len()),
                thousands_format(skipped)
            ),
            self.verbose,
        );

        Ok(dataset)
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sorrel_masks_{}_{}", tag, std::process::id()));
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_pair(dir: &Path, stem: &str) {
        let images = dir.join("images_src");
        let masks = dir.join("masks_src");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::create_dir_all(&masks).unwrap();

        RgbImage::new(16, 16)
            .save(images.join(format!("{}.png", stem)))
            .unwrap();

        let mut mask = RgbImage::new(16, 16);

        for y in 1..4 {
            for x in 1..4 {
                mask.put_pixel(x, y, Rgb([180, 20, 20]));
            }
        }

        for y in 9..14 {
            for x in 9..14 {
                mask.put_pixel(x, y, Rgb([180, 20, 20]));
            }
        }

        mask.save(masks.join(format!("{}_mask.png", stem))).unwrap();
    }

    fn converter() -> MaskConverter {
        let registry = LabelRegistry::new(["plant"]).unwrap();
        let mut converter = MaskConverter::new(registry, "plant");
        converter.mask_substring = Some("_mask".to_string());
        converter
    }

    #[test]
    fn test_instances_mode_splits_islands() {
        let dir = scratch_dir("instances");
        write_pair(&dir, "plot_1");

        let dataset = converter()
            .run(
                &dir.join("images_src"),
                &dir.join("masks_src"),
                &dir.join("annotations.json"),
                &dir.join("images"),
            )
            .unwrap();

        assert_eq!(dataset.images.len(), 1);
        assert_eq!(dataset.annotations.len(), 2);
        assert_eq!(dataset.annotations[0].id, 1);
        assert_eq!(dataset.annotations[1].id, 2);
        assert!(dir.join("images/plot_1.png").exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_merged_mode_unions_islands() {
        let dir = scratch_dir("merged");
        write_pair(&dir, "plot_1");

        let mut converter = converter();
        converter.mode = MaskMode::Merged;

        let dataset = converter
            .run(
                &dir.join("images_src"),
                &dir.join("masks_src"),
                &dir.join("annotations.json"),
                &dir.join("images"),
            )
            .unwrap();

        assert_eq!(dataset.annotations.len(), 1);
        assert_eq!(dataset.annotations[0].bbox, [1.0, 1.0, 12.0, 12.0]);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_unknown_category_is_fatal() {
        let dir = scratch_dir("category");
        write_pair(&dir, "plot_1");

        let registry = LabelRegistry::new(["plant"]).unwrap();
        let converter = MaskConverter::new(registry, "weed");

        let converted = converter.run(
            &dir.join("images_src"),
            &dir.join("masks_src"),
            &dir.join("annotations.json"),
            &dir.join("images"),
        );

        assert!(matches!(converted, Err(SorrelError::LabelError(_))));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
