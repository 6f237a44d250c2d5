// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::{Path, PathBuf};

use kdam::TqdmIterator;
use serde::Deserialize;

use crate::coco::{CocoAnnotation, CocoDataset, CocoImage, Info, LabelRegistry};
use crate::constant;
use crate::convert::{CancelFlag, check_cancelled};
use crate::error::SorrelError;
use crate::ut::path::{collect_dir_paths, collect_file_paths_nested, create_output_directory};
use crate::ut::records::read_delimited_file;
use crate::ut::track::{progress_bar, progress_log, thousands_format};

#[derive(Debug, Deserialize)]
struct SyntheticMetaFile {
    image_size: [u32; 2],
    generation_date: String,
}

/// Metadata describing a synthetic renderer dataset
///
/// Parsed from the fixed-location `.metadata` pair: `config_<name>.txt`
/// carries the annotation type (line 2) and the space-separated label
/// vocabulary (line 4), `meta.json` carries the render resolution and
/// generation date.
#[derive(Debug, Clone)]
pub struct SyntheticMetadata {
    pub path: PathBuf,
    pub name: String,
    pub image_size: [u32; 2],
    pub annotation_type: String,
    pub labels: Vec<String>,
    pub generation_date: String,
}

impl SyntheticMetadata {
    /// Parse the metadata pair of a renderer dataset
    ///
    /// # Arguments
    ///
    /// * `root` - The dataset root directory
    pub fn parse<P: AsRef<Path>>(root: P) -> Result<SyntheticMetadata, SorrelError> {
        let root = root.as_ref();

        if !root.is_dir() {
            return Err(SorrelError::DirError(root.display().to_string()));
        }

        let name = root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| SorrelError::DirError(root.display().to_string()))?;

        let metadata_dir = root.join(constant::METADATA_DIR_NAME);

        let config_path = metadata_dir.join(format!("config_{}.txt", name));
        let config = std::fs::read_to_string(&config_path).map_err(|_| {
            SorrelError::MetadataError(format!(
                "Missing configuration file {}",
                config_path.display()
            ))
        })?;

        let lines: Vec<&str> = config.lines().collect();

        if lines.len() < 4 {
            return Err(SorrelError::MetadataError(format!(
                "Expected at least 4 configuration lines, found {}",
                lines.len()
            )));
        }

        let annotation_type = lines[1].trim().to_string();

        let labels: Vec<String> = lines[3].split_whitespace().map(str::to_string).collect();

        if labels.is_empty() {
            return Err(SorrelError::MetadataError(
                "The configuration file names no labels".to_string(),
            ));
        }

        let meta_path = metadata_dir.join("meta.json");
        let meta = std::fs::read_to_string(&meta_path).map_err(|_| {
            SorrelError::MetadataError(format!("Missing metadata file {}", meta_path.display()))
        })?;

        let meta: SyntheticMetaFile = serde_json::from_str(&meta)
            .map_err(|err| SorrelError::MetadataError(err.to_string()))?;

        Ok(SyntheticMetadata {
            path: root.to_path_buf(),
            name,
            image_size: meta.image_size,
            annotation_type,
            labels,
            generation_date: meta.generation_date,
        })
    }
}

/// Reorganize a synthetic renderer dataset into the canonical layout
///
/// The renderer writes one image per view directory with one normalized
/// coordinate text file per label beside it. Conversion rewrites this into
/// an `images/` directory of `{subject}-{view}.jpeg` files plus one
/// `annotations.json` bundle at the dataset root.
///
/// The conversion is transactional: all new output is staged under a
/// scratch directory inside the dataset and renamed into place only after
/// every image converts, and the original per-subject directories are
/// deleted only after that commit. Any failure discards the staged output
/// and leaves the source tree untouched.
///
/// # Examples
///
/// ```no_run
/// use sorrel::convert::SyntheticConverter;
///
/// let converter = SyntheticConverter::new();
/// let dataset = converter.run("renders/lettuce_field").unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyntheticConverter {
    pub verbose: bool,
    pub cancel: Option<CancelFlag>,
}

impl SyntheticConverter {
    /// Initialize a converter with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert the renderer dataset rooted at `root`
    pub fn run<P: AsRef<Path>>(&self, root: P) -> Result<CocoDataset, SorrelError> {
        let meta = SyntheticMetadata::parse(&root)?;

        if meta.annotation_type != "object_detection" {
            return Err(SorrelError::MetadataError(format!(
                "Unsupported annotation type: {}",
                meta.annotation_type
            )));
        }

        let registry = LabelRegistry::new(meta.labels.clone())?;

        let staging = meta.path.join(constant::STAGING_DIR_NAME);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)
                .map_err(|err| SorrelError::DirError(err.to_string()))?;
        }

        let staged = self
            .convert(&meta, &registry, &staging)
            .and_then(|dataset| {
                self.commit(&meta.path, &staging)?;
                Ok(dataset)
            });

        match staged {
            Ok(dataset) => {
                self.remove_source_dirs(&meta.path)?;

                progress_log(
                    &format!(
                        "Complete. {} images reorganized with {} annotations.",
                        thousands_format(dataset.images.len()),
                        thousands_format(dataset.annotations.len())
                    ),
                    self.verbose,
                );

                Ok(dataset)
            }
            Err(err) => {
                let _ = std::fs::remove_dir_all(&staging);
                Err(err)
            }
        }
    }

    /// Build the full converted dataset under the staging directory
    fn convert(
        &self,
        meta: &SyntheticMetadata,
        registry: &LabelRegistry,
        staging: &Path,
    ) -> Result<CocoDataset, SorrelError> {
        let mut images = Vec::new();

        for dir in collect_dir_paths(meta.path.to_string_lossy().to_string())? {
            let starts_with_image = dir
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("image"));

            if starts_with_image {
                images.extend(collect_file_paths_nested(&dir, &["jpeg"])?);
            }
        }

        images.sort();

        if images.is_empty() {
            return Err(SorrelError::NoFileError(format!(
                "No renderer images below {}",
                meta.path.display()
            )));
        }

        let staged_images = create_output_directory(staging.join(constant::IMAGE_DIR_NAME))?;

        let info = Info {
            description: format!("{}: synthetic render dataset", meta.name),
            date_created: meta.generation_date.clone(),
            ..Info::default()
        };

        let mut dataset = CocoDataset::new(info, registry.categories());
        let mut annotation_id: u32 = 1;

        let [height, width] = meta.image_size;

        let pb = progress_bar(images.len(), "Reorganizing renderer images", self.verbose);

        for (index, image) in images.iter().enumerate().tqdm_with_bar(pb) {
            check_cancelled(self.cancel.as_ref())?;

            let image_id = index as u32 + 1;

            let image_dir = image
                .parent()
                .ok_or_else(|| SorrelError::DirError(image.display().to_string()))?;

            let boxes = read_image_boxes(image_dir, registry, meta)?;

            let file_name = subject_view_name(image)?;

            std::fs::copy(image, staged_images.join(&file_name))
                .map_err(|_| SorrelError::ImageWriteError)?;

            dataset.images.push(CocoImage {
                file_name,
                height,
                width,
                id: image_id,
            });

            for (category_id, bbox) in boxes {
                dataset.annotations.push(CocoAnnotation {
                    area: bbox[2] * bbox[3],
                    iscrowd: 0,
                    bbox,
                    category_id,
                    image_id,
                    id: annotation_id,
                    segmentation: Vec::new(),
                });

                annotation_id += 1;
            }
        }

        if self.verbose {
            println!()
        }

        dataset.save(staging.join(constant::ANNOTATION_FILE_NAME))?;

        Ok(dataset)
    }

    /// Rename the staged output into place and drop the staging directory
    fn commit(&self, root: &Path, staging: &Path) -> Result<(), SorrelError> {
        std::fs::rename(
            staging.join(constant::IMAGE_DIR_NAME),
            root.join(constant::IMAGE_DIR_NAME),
        )
        .map_err(|err| SorrelError::DirError(err.to_string()))?;

        std::fs::rename(
            staging.join(constant::ANNOTATION_FILE_NAME),
            root.join(constant::ANNOTATION_FILE_NAME),
        )
        .map_err(|err| SorrelError::DirError(err.to_string()))?;

        std::fs::remove_dir_all(staging).map_err(|err| SorrelError::DirError(err.to_string()))?;

        Ok(())
    }

    /// Delete the original per-subject directories after a committed run
    fn remove_source_dirs(&self, root: &Path) -> Result<(), SorrelError> {
        for dir in collect_dir_paths(root.to_string_lossy().to_string())? {
            let trailing_digit = dir
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.chars().last())
                .is_some_and(|last| last.is_ascii_digit());

            if trailing_digit {
                std::fs::remove_dir_all(&dir)
                    .map_err(|err| SorrelError::DirError(err.to_string()))?;
            }
        }

        Ok(())
    }
}

/// Read every label's coordinate file beside one renderer image
///
/// Rows are `class x_center y_center width height` in normalized units
/// with the y axis measured from the bottom of the render; conversion
/// flips the axis and scales into truncated pixel units. A label whose
/// file is absent may fall back to its one known alias before failing.
fn read_image_boxes(
    image_dir: &Path,
    registry: &LabelRegistry,
    meta: &SyntheticMetadata,
) -> Result<Vec<(u32, [f64; 4])>, SorrelError> {
    let [height, width] = meta.image_size;
    let (height, width) = (height as f64, width as f64);

    let mut boxes = Vec::new();

    for (index, label) in registry.names().iter().enumerate() {
        let category_id = index as u32 + 1;

        let mut path = image_dir.join(format!(
            "{}{}.txt",
            constant::SYNTHETIC_LABEL_FILE_PREFIX,
            label
        ));

        if !path.exists() {
            let alias = constant::LABEL_ALIASES
                .iter()
                .find(|(primary, _)| *primary == label.as_str())
                .map(|(_, alias)| {
                    image_dir.join(format!(
                        "{}{}.txt",
                        constant::SYNTHETIC_LABEL_FILE_PREFIX,
                        alias
                    ))
                })
                .filter(|alias| alias.exists());

            path = alias.ok_or_else(|| {
                SorrelError::NoFileError(format!(
                    "The annotation file {} for the label {} does not exist",
                    path.display(),
                    label
                ))
            })?;
        }

        let (rows, _) = read_delimited_file(&path, ' ', false)?;

        for row in rows {
            if row.len() < 5 {
                return Err(SorrelError::RecordError(format!(
                    "Expected 5 columns in {}, found {}",
                    path.display(),
                    row.len()
                )));
            }

            let value = |index: usize| -> Result<f64, SorrelError> {
                row[index].parse::<f64>().map_err(|_| {
                    SorrelError::RecordError(format!(
                        "Invalid coordinate {} in {}",
                        row[index],
                        path.display()
                    ))
                })
            };

            let x_center = value(1)?;
            let y_center = value(2)?;
            let box_width = value(3)?;
            let box_height = value(4)?;

            let x_min = (x_center - box_width / 2.0) * width;
            let y_min = ((1.0 - y_center) - box_height / 2.0) * height;

            boxes.push((
                category_id,
                [
                    (x_min as i64) as f64,
                    (y_min as i64) as f64,
                    ((box_width * width) as i64) as f64,
                    ((box_height * height) as i64) as f64,
                ],
            ));
        }
    }

    Ok(boxes)
}

/// Build the collision-free `{subject}-{view}.jpeg` output name
fn subject_view_name(image: &Path) -> Result<String, SorrelError> {
    let view = image
        .parent()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().to_string());

    let subject = image
        .parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().to_string());

    match (subject, view) {
        (Some(subject), Some(view)) => Ok(format!("{}-{}.jpeg", subject, view)),
        _ => Err(SorrelError::DirError(image.display().to_string())),
    }
}
