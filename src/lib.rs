// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

//! # sorrel
//!
//! Annotation format conversion for image-based crop datasets. Heterogeneous
//! per-dataset encodings (delimited box listings, VOC-style XML, colored
//! instance masks, and the synthetic renderer layout) are rewritten into a
//! single canonical COCO-style JSON bundle plus a normalized image directory.

pub mod coco;
pub mod constant;
pub mod convert;
pub mod cv;
pub mod error;
pub mod ex;
pub mod im;
pub mod ut;
