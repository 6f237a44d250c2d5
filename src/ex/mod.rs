//! Annotation extraction strategies
//!
//! One extractor per upstream source encoding: flat line-record boxes,
//! VOC-style XML objects, raster sub-masks, and already-vectorized point
//! lists. A conversion driver selects its strategy once per job from the
//! source format; the strategies stay independently testable.

pub mod line;
pub mod mask;
pub mod points;
pub mod voc;
