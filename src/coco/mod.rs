mod labels;
mod records;

pub use labels::LabelRegistry;

pub use records::CocoAnnotation;
pub use records::CocoCategory;
pub use records::CocoDataset;
pub use records::CocoImage;
pub use records::Info;
