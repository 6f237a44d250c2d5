// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::SorrelError;

/// Create an output directory, including any missing parents
///
/// # Arguments
///
/// * `directory` - Path to the new directory
///
/// # Examples
///
/// ```no_run
/// use sorrel::ut::path::create_output_directory;
/// let images = create_output_directory("converted/images").unwrap();
/// ```
pub fn create_output_directory<P: AsRef<Path>>(directory: P) -> Result<PathBuf, SorrelError> {
    let directory = directory.as_ref();

    std::fs::create_dir_all(directory).map_err(|err| SorrelError::DirError(err.to_string()))?;

    Ok(directory.to_path_buf())
}

/// Collect file paths from a directory with an optional substring filter
///
/// Paths are returned in sorted order so repeated runs over an unchanged
/// directory always enumerate files identically.
///
/// # Arguments
///
/// * `directory` - Path to directory containing files
/// * `valid_ext` - Only include files with one of these extensions
/// * `substring` - Only include files containing this substring
///
/// # Examples
///
/// ```no_run
/// use sorrel::ut::path::collect_file_paths;
/// use sorrel::constant::SUPPORTED_IMAGE_FORMATS;
/// let files = collect_file_paths("directory/", SUPPORTED_IMAGE_FORMATS.as_slice(), None);
/// ```
pub fn collect_file_paths<P>(
    directory: P,
    valid_ext: &[&str],
    substring: Option<String>,
) -> Result<Vec<PathBuf>, SorrelError>
where
    P: AsRef<Path> + ToString,
{
    let message = directory.to_string();

    let mut files: Vec<PathBuf> = std::fs::read_dir(directory)
        .map_err(|_| SorrelError::DirError(message))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| valid_ext.contains(&ext))
        })
        .collect();

    if let Some(substring) = substring {
        files.retain(|f| {
            f.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.contains(&substring))
        });
    }

    files.sort();

    Ok(files)
}

/// Collect the immediate subdirectories of a directory
///
/// # Arguments
///
/// * `directory` - Path to a readable directory
pub fn collect_dir_paths<P>(directory: P) -> Result<Vec<PathBuf>, SorrelError>
where
    P: AsRef<Path> + ToString,
{
    let message = directory.to_string();

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(directory)
        .map_err(|_| SorrelError::DirError(message))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();

    dirs.sort();

    Ok(dirs)
}

/// Collect all nested subdirectories of a directory in pre-order
///
/// # Arguments
///
/// * `directory` - Path to a readable directory
pub fn collect_dir_paths_nested<P: AsRef<Path>>(directory: P) -> Result<Vec<PathBuf>, SorrelError> {
    let mut nested = Vec::new();

    for dir in collect_dir_paths(directory.as_ref().to_string_lossy().to_string())? {
        nested.push(dir.clone());
        nested.extend(collect_dir_paths_nested(&dir)?);
    }

    Ok(nested)
}

/// Recursively collect files with a valid extension below a directory
///
/// Paths are returned in sorted order so repeated runs over an unchanged
/// tree always enumerate files identically.
///
/// # Arguments
///
/// * `directory` - Path to a readable directory
/// * `valid_ext` - Only include files with one of these extensions
pub fn collect_file_paths_nested<P: AsRef<Path>>(
    directory: P,
    valid_ext: &[&str],
) -> Result<Vec<PathBuf>, SorrelError> {
    let directory = directory.as_ref();

    let mut files =
        collect_file_paths(directory.to_string_lossy().to_string(), valid_ext, None)?;

    for dir in collect_dir_paths(directory.to_string_lossy().to_string())? {
        files.extend(collect_file_paths_nested(&dir, valid_ext)?);
    }

    files.sort();

    Ok(files)
}

/// Collect file pairs that share a matching stem
///
/// # Arguments
///
/// * `files_a` - List of file paths
/// * `files_b` - List of file paths
/// * `substring_a` - Optionally remove a substring from the first set of stems
/// * `substring_b` - Optionally remove a substring from the second set of stems
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use sorrel::ut::path::collect_file_pairs;
///
/// let files_a: [PathBuf; 2] = [
///     PathBuf::from("images/plot_1.png"),
///     PathBuf::from("images/plot_2.png"),
/// ];
///
/// let files_b: [PathBuf; 2] = [
///     PathBuf::from("masks/plot_1_mask.png"),
///     PathBuf::from("masks/plot_2_mask.png"),
/// ];
///
/// let pairs = collect_file_pairs(&files_a, &files_b, None, Some("_mask".to_string()));
/// assert_eq!(pairs.len(), 2);
/// assert_eq!(pairs[0].0, "plot_1");
/// ```
pub fn collect_file_pairs(
    files_a: &[PathBuf],
    files_b: &[PathBuf],
    substring_a: Option<String>,
    substring_b: Option<String>,
) -> Vec<(String, PathBuf, PathBuf)> {
    let substring_a = substring_a.unwrap_or_default();
    let substring_b = substring_b.unwrap_or_default();

    let file_map: HashMap<String, &PathBuf> = files_a
        .iter()
        .filter_map(|file| {
            file.file_stem().map(|stem| {
                let name = stem.to_string_lossy().replace(&substring_a, "");
                (name, file)
            })
        })
        .collect();

    let mut pairs: Vec<(String, PathBuf, PathBuf)> = files_b
        .par_iter()
        .filter_map(|file_b| {
            file_b.file_stem().and_then(|stem| {
                let name = stem.to_string_lossy().replace(&substring_b, "");
                file_map
                    .get(&name)
                    .map(|file_a| (name, (*file_a).clone(), file_b.clone()))
            })
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}

/// Build a numeric id from the first contiguous digit run in a file name
///
/// Ids derived this way stay stable when the source listing is re-ordered,
/// unlike sequential indices.
///
/// # Examples
///
/// ```
/// use sorrel::ut::path::numeric_file_id;
///
/// assert_eq!(numeric_file_id("frame_00012.png"), Some(12));
/// assert_eq!(numeric_file_id("plot4_view2.xml"), Some(4));
/// assert_eq!(numeric_file_id("no_digits.png"), None);
/// ```
pub fn numeric_file_id(file_name: &str) -> Option<u32> {
    let digits: String = file_name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return None;
    }

    digits.parse::<u32>().ok()
}
