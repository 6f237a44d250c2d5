// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::fmt;

#[derive(Debug, Clone)]
pub enum SorrelError {
    BoxError(String),
    LabelError(String),
    RecordError(String),
    ImageReadError,
    ImageWriteError,
    ImageExtensionError,
    XmlError(String),
    MetadataError(String),
    JsonReadError,
    JsonWriteError,
    NoFileError(String),
    DirError(String),
    JobCancelled,
}

impl fmt::Display for SorrelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SorrelError::BoxError(message) => {
                write!(
                    f,
                    "[sorrel::BoxError] The bounding box is invalid as x_max (y_max) must be greater than x_min (y_min). {}",
                    message
                )
            }
            SorrelError::LabelError(message) => {
                write!(
                    f,
                    "[sorrel::LabelError] The label could not be resolved to a category id. {}",
                    message
                )
            }
            SorrelError::RecordError(message) => {
                write!(
                    f,
                    "[sorrel::RecordError] The annotation record is malformed. {}",
                    message
                )
            }
            SorrelError::ImageReadError => {
                write!(f, "[sorrel::ImageReadError] Failed to read image.")
            }
            SorrelError::ImageWriteError => {
                write!(f, "[sorrel::ImageWriteError] Failed to write image.")
            }
            SorrelError::ImageExtensionError => {
                write!(
                    f,
                    "[sorrel::ImageExtensionError] Could not detect a valid image extension for input."
                )
            }
            SorrelError::XmlError(message) => {
                write!(
                    f,
                    "[sorrel::XmlError] The annotation XML could not be parsed. {}",
                    message
                )
            }
            SorrelError::MetadataError(message) => {
                write!(
                    f,
                    "[sorrel::MetadataError] The dataset metadata could not be parsed. {}",
                    message
                )
            }
            SorrelError::JsonReadError => {
                write!(f, "[sorrel::JsonReadError] The dataset JSON could not be read.")
            }
            SorrelError::JsonWriteError => {
                write!(
                    f,
                    "[sorrel::JsonWriteError] Failed to successfully write the dataset JSON to output."
                )
            }
            SorrelError::NoFileError(message) => {
                write!(
                    f,
                    "[sorrel::NoFileError] File could not be found. {}.",
                    message
                )
            }
            SorrelError::DirError(message) => {
                write!(
                    f,
                    "[sorrel::DirError] Directory could not be read. {}.",
                    message
                )
            }
            SorrelError::JobCancelled => {
                write!(
                    f,
                    "[sorrel::JobCancelled] The conversion job was cancelled before the output was written."
                )
            }
        }
    }
}

impl std::error::Error for SorrelError {}
