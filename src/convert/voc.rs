// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kdam::TqdmIterator;

use crate::coco::{CocoDataset, Info, LabelRegistry};
use crate::convert::{CancelFlag, ImageIdPolicy, check_cancelled, emit_image};
use crate::error::SorrelError;
use crate::ex::voc;
use crate::im::resolve_image;
use crate::ut::path::create_output_directory;
use crate::ut::track::{progress_bar, progress_log, thousands_format};

/// Convert a set of VOC-style XML annotation files into a COCO bundle
///
/// One XML file per image. Objects with out-of-vocabulary labels are
/// dropped silently, unreadable images are logged and skipped, and a
/// degenerate bounding box aborts the job. Rerunning over an unchanged
/// source set with the same id policy reproduces the output byte for byte.
///
/// # Examples
///
/// ```no_run
/// use sorrel::coco::LabelRegistry;
/// use sorrel::convert::{ImageIdPolicy, VocXmlConverter};
/// use sorrel::ut::path::collect_file_paths;
///
/// let registry = LabelRegistry::new(["leaf", "stem"]).unwrap();
///
/// let annotations = collect_file_paths("dataset/annotations", &["xml"], None).unwrap();
///
/// let mut converter = VocXmlConverter::new(registry);
/// converter.id_policy = ImageIdPolicy::FilenameDigits;
///
/// let dataset = converter
///     .run(&annotations, None, "out/annotations.json".as_ref(), "out/images".as_ref())
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct VocXmlConverter {
    pub registry: LabelRegistry,
    pub info: Info,
    pub id_policy: ImageIdPolicy,
    pub resize: f32,
    pub name_remap: Option<HashMap<String, String>>,
    pub composite_filename: bool,
    pub verbose: bool,
    pub cancel: Option<CancelFlag>,
}

impl VocXmlConverter {
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
            name_remap: None,
            composite_filename: false,
            verbose: false,
            cancel: None,
        }
    }

    /// Run the conversion job over a set of annotation files
    ///
    /// # Arguments
    ///
    /// * `annotation_paths` - One XML file per image
    /// * `image_paths` - Optional explicit image list; used instead of the
    ///   XML image reference when it matches the annotation list in length
    /// * `output_json` - Destination path for the bundle JSON
    /// * `output_images` - Destination directory for converted images
    pub fn run(
        &self,
        annotation_paths: &[PathBuf],
        image_paths: Option<&[PathBuf]>,
        output_json: &Path,
        output_images: &Path,
    ) -> Result<CocoDataset, SorrelError> {
        let output_images = create_output_directory(output_images)?;

        let mut dataset = CocoDataset::new(self.info.clone(), self.registry.categories());
        let mut annotation_id: u32 = 1;
        let mut skipped: usize = 0;

        let image_paths = image_paths.filter(|paths| paths.len() == annotation_paths.len());

        let pb = progress_bar(annotation_paths.len(), "Converting XML annotations", self.verbose);

        for (index, annotation_path) in annotation_paths.iter().enumerate().tqdm_with_bar(pb) {
            check_cancelled(self.cancel.as_ref())?;

            let contents = std::fs::read_to_string(annotation_path)
                .map_err(|err| SorrelError::NoFileError(err.to_string()))?;

            let document = roxmltree::Document::parse(&contents).map_err(|err| {
                SorrelError::XmlError(format!("{}: {}", annotation_path.display(), err))
            })?;

            let root = document.root_element();

            let image_ref = match image_paths {
                Some(paths) => paths[index].clone(),
                None => image_reference(root, annotation_path)?,
            };

            let xml_name = annotation_path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();

            let image_id = self.id_policy.image_id(index, &xml_name)?;

            let resolved =
                resolve_image(&image_ref, image_id, self.resize, self.composite_filename);

            let (record, image) = match resolved {
                Ok(resolved) => resolved,
                Err(_) => {
                    progress_log(
                        &format!("Cannot open {}", image_ref.display()),
                        self.verbose,
                    );
                    skipped += 1;
                    continue;
                }
            };

            let destination = output_images.join(&record.file_name);
            if emit_image(&image_ref, &image, &destination, self.resize != 1.0).is_err() {
                progress_log(
                    &format!("Cannot copy {}", image_ref.display()),
                    self.verbose,
                );
                skipped += 1;
                continue;
            }

            for object in root.descendants().filter(|n| n.has_tag_name("object")) {
                let annotation = voc::from_object(
                    object,
                    &self.registry,
                    self.name_remap.as_ref(),
                    record.id,
                    annotation_id,
                )?;

                if let Some(annotation) = annotation {
                    dataset.annotations.push(annotation);
                    annotation_id += 1;
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
                "Complete. {} images converted with {} annotations. {} images skipped.",
                thousands_format(dataset.images.len()),
                thousands_format(dataset.annotations.len()),
                thousands_format(skipped)
            ),
            self.verbose,
        );

        Ok(dataset)
    }
}

/// Derive the source image path from an annotation's `path` or `filename`
///
/// A relative reference that does not resolve from the working directory
/// is retried beside the annotation file.
fn image_reference(
    root: roxmltree::Node,
    annotation_path: &Path,
) -> Result<PathBuf, SorrelError> {
    let reference = root
        .descendants()
        .find(|n| n.has_tag_name("path") || n.has_tag_name("filename"))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            SorrelError::XmlError(format!(
                "{}: no <path> or <filename> image reference",
                annotation_path.display()
            ))
        })?;

    let reference = PathBuf::from(reference);

    if reference.is_relative() && !reference.exists() {
        if let Some(parent) = annotation_path.parent() {
            let sibling = parent.join(&reference);
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    Ok(reference)
}

#[cfg(test)]
mod test {

    use super::*;
    use image::RgbImage;
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sorrel_voc_{}_{}", tag, std::process::id()));
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_annotation(dir: &Path, stem: &str, objects: &str) -> PathBuf {
        let image = dir.join(format!("{}.png", stem));
        RgbImage::new(64, 48).save(&image).unwrap();

        let xml = format!(
            "<annotation><filename>{}.png</filename>{}</annotation>",
            stem, objects
        );

        let path = dir.join(format!("{}.xml", stem));
        std::fs::write(&path, xml).unwrap();
        path
    }

    fn leaf_object(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> String {
        format!(
            "<object><name>leaf</name><bndbox>\
             <xmin>{}</xmin><ymin>{}</ymin><xmax>{}</xmax><ymax>{}</ymax>\
             </bndbox></object>",
            xmin, ymin, xmax, ymax
        )
    }

    fn registry() -> LabelRegistry {
        LabelRegistry::new(["leaf", "stem"]).unwrap()
    }

    #[test]
    fn test_convert_and_rerun_byte_identical() {
        let dir = scratch_dir("idempotent");

        let annotations = vec![
            write_annotation(
                &dir,
                "plant_01",
                &format!("{}{}", leaf_object(10, 10, 50, 50), leaf_object(2, 2, 6, 6)),
            ),
            write_annotation(&dir, "plant_02", &leaf_object(1, 1, 30, 20)),
        ];

        let mut converter = VocXmlConverter::new(registry());
        converter.id_policy = ImageIdPolicy::FilenameDigits;

        let first_json = dir.join("first.json");
        let second_json = dir.join("second.json");

        let dataset = converter
            .run(&annotations, None, &first_json, &dir.join("images_a"))
            .unwrap();

        converter
            .run(&annotations, None, &second_json, &dir.join("images_b"))
            .unwrap();

        let first = std::fs::read(&first_json).unwrap();
        let second = std::fs::read(&second_json).unwrap();
        assert_eq!(first, second);

        assert_eq!(dataset.images.len(), 2);
        assert_eq!(dataset.images[0].id, 1);
        assert_eq!(dataset.images[1].id, 2);

        let ids: Vec<u32> = dataset.annotations.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(dataset.annotations[0].bbox, [9.0, 9.0, 40.0, 40.0]);
        assert!(dir.join("images_a/plant_01.png").exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_unknown_labels_skipped_silently() {
        let dir = scratch_dir("unknown");

        let object = "<object><name>flower</name><bndbox>\
                      <xmin>1</xmin><ymin>1</ymin><xmax>5</xmax><ymax>5</ymax>\
                      </bndbox></object>";

        let annotations = vec![write_annotation(&dir, "plant_01", object)];

        let converter = VocXmlConverter::new(registry());
        let dataset = converter
            .run(
                &annotations,
                None,
                &dir.join("annotations.json"),
                &dir.join("images"),
            )
            .unwrap();

        assert_eq!(dataset.images.len(), 1);
        assert!(dataset.annotations.is_empty());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_explicit_image_list_overrides_reference() {
        let dir = scratch_dir("explicit");

        let annotation = write_annotation(&dir, "plant_01", &leaf_object(1, 1, 5, 5));

        // Point the XML at a file that does not exist; the explicit list wins
        let xml = "<annotation><filename>missing.png</filename>\
                   <object><name>leaf</name><bndbox>\
                   <xmin>1</xmin><ymin>1</ymin><xmax>5</xmax><ymax>5</ymax>\
                   </bndbox></object></annotation>";
        std::fs::write(&annotation, xml).unwrap();

        let images = vec![dir.join("plant_01.png")];

        let converter = VocXmlConverter::new(registry());
        let dataset = converter
            .run(
                &[annotation],
                Some(&images),
                &dir.join("annotations.json"),
                &dir.join("images"),
            )
            .unwrap();

        assert_eq!(dataset.images.len(), 1);
        assert_eq!(dataset.annotations.len(), 1);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_image_logged_and_skipped() {
        let dir = scratch_dir("missing");

        let xml = "<annotation><filename>missing.png</filename></annotation>";
        let path = dir.join("plant_01.xml");
        std::fs::write(&path, xml).unwrap();

        let converter = VocXmlConverter::new(registry());
        let dataset = converter
            .run(
                &[path],
                None,
                &dir.join("annotations.json"),
                &dir.join("images"),
            )
            .unwrap();

        assert!(dataset.images.is_empty());
        assert_eq!(dataset.categories.len(), 2);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
