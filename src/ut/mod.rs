pub mod path;
pub mod records;
pub mod track;
