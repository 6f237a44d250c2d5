// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::Path;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::SorrelError;

/// Job-level metadata stored under the bundle's `info` key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Info {
    pub description: String,
    pub url: String,
    pub version: String,
    pub year: i32,
    pub contributor: String,
    pub date_created: String,
}

impl Default for Info {
    fn default() -> Self {
        let now = chrono::Local::now();
        Self {
            description: "Converted with sorrel".to_string(),
            url: "None".to_string(),
            version: "1.0".to_string(),
            year: now.year(),
            contributor: "None".to_string(),
            date_created: now.format("%Y-%m-%d").to_string(),
        }
    }
}

/// One converted source image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CocoImage {
    pub file_name: String,
    pub height: u32,
    pub width: u32,
    pub id: u32,
}

/// One object annotation in (x, y, width, height) pixel units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CocoAnnotation {
    pub area: f64,
    pub iscrowd: u32,
    pub bbox: [f64; 4],
    pub category_id: u32,
    pub image_id: u32,
    pub id: u32,
    pub segmentation: Vec<Vec<f64>>,
}

/// One category from the job's label vocabulary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CocoCategory {
    pub supercategory: String,
    pub id: u32,
    pub name: String,
}

/// A complete converted dataset
///
/// The bundle owns every record produced by one conversion job. It is
/// serialized as a single JSON document; partially-converted jobs never
/// reach `save`, so an output file on disk always describes a complete
/// conversion.
///
/// # Examples
///
/// ```
/// use sorrel::coco::{CocoDataset, Info};
///
/// let dataset = CocoDataset::new(Info::default(), Vec::new());
/// assert!(dataset.images.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CocoDataset {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
    pub info: Info,
}

impl CocoDataset {
    /// Initialize an empty bundle for a conversion job
    ///
    /// # Arguments
    ///
    /// * `info` - Job metadata
    /// * `categories` - The full category list for the job's vocabulary
    pub fn new(info: Info, categories: Vec<CocoCategory>) -> Self {
        Self {
            images: Vec::new(),
            annotations: Vec::new(),
            categories,
            info,
        }
    }

    /// Open a converted dataset from the provided path
    ///
    /// # Arguments
    ///
    /// * `path` - A path to a dataset JSON document
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sorrel::coco::CocoDataset;
    /// let dataset = CocoDataset::open("annotations.json");
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<CocoDataset, SorrelError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if extension.as_deref() != Some("json") {
            return Err(SorrelError::JsonReadError);
        }

        let contents = std::fs::read_to_string(path).map_err(|_| SorrelError::JsonReadError)?;

        serde_json::from_str(&contents).map_err(|_| SorrelError::JsonReadError)
    }

    /// Save the bundle as one JSON document at the provided path
    ///
    /// The document is serialized in full before any bytes reach disk so a
    /// failed serialization cannot leave a truncated bundle behind.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to save the dataset JSON
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sorrel::coco::{CocoDataset, Info};
    ///
    /// let dataset = CocoDataset::new(Info::default(), Vec::new());
    /// dataset.save("annotations.json").unwrap();
    /// ```
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SorrelError> {
        let contents = serde_json::to_vec(self).map_err(|_| SorrelError::JsonWriteError)?;

        std::fs::write(path, contents).map_err(|_| SorrelError::JsonWriteError)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use std::collections::BTreeSet;

    fn small_bundle() -> CocoDataset {
        let mut dataset = CocoDataset::new(
            Info::default(),
            vec![CocoCategory {
                supercategory: "none".to_string(),
                id: 1,
                name: "leaf".to_string(),
            }],
        );

        dataset.images.push(CocoImage {
            file_name: "a.png".to_string(),
            height: 32,
            width: 32,
            id: 7,
        });

        dataset.annotations.push(CocoAnnotation {
            area: 4.0,
            iscrowd: 0,
            bbox: [1.0, 1.0, 2.0, 2.0],
            category_id: 1,
            image_id: 7,
            id: 1,
            segmentation: vec![],
        });

        dataset
    }

    #[test]
    fn test_round_trip_preserves_ids() {
        let path =
            std::env::temp_dir().join(format!("sorrel_bundle_{}.json", std::process::id()));

        let dataset = small_bundle();
        dataset.save(&path).unwrap();

        let reopened = CocoDataset::open(&path).unwrap();

        let image_ids: BTreeSet<u32> = dataset.images.iter().map(|i| i.id).collect();
        let reopened_image_ids: BTreeSet<u32> = reopened.images.iter().map(|i| i.id).collect();
        assert_eq!(image_ids, reopened_image_ids);

        let ann_ids: BTreeSet<u32> = dataset.annotations.iter().map(|a| a.id).collect();
        let reopened_ann_ids: BTreeSet<u32> = reopened.annotations.iter().map(|a| a.id).collect();
        assert_eq!(ann_ids, reopened_ann_ids);

        let cat_ids: BTreeSet<u32> = dataset.categories.iter().map(|c| c.id).collect();
        let reopened_cat_ids: BTreeSet<u32> = reopened.categories.iter().map(|c| c.id).collect();
        assert_eq!(cat_ids, reopened_cat_ids);

        assert_eq!(dataset, reopened);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_open_requires_json_extension() {
        let opened = CocoDataset::open("annotations.txt");
        assert!(opened.is_err());
    }
}
