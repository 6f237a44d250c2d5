// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::SorrelError;

/// Read a delimiter-separated annotation file into rows of string tokens
///
/// Tokens are trimmed and empty tokens are dropped, so repeated delimiters
/// and trailing whitespace do not produce phantom columns. Lines that end
/// up with no tokens at all yield no row. When `header` is set, the first
/// line is split and returned separately instead of becoming a row.
///
/// # Arguments
///
/// * `path` - Path to a delimiter-separated text file
/// * `delimiter` - Token separator, e.g. ' ' or ','
/// * `header` - Peel the first line off as a header
///
/// # Examples
///
/// ```no_run
/// use sorrel::ut::records::read_delimited_file;
///
/// let (rows, header) = read_delimited_file("train.txt", ' ', false).unwrap();
/// assert!(header.is_none());
/// for row in rows {
///     let image = &row[0];
/// }
/// ```
pub fn read_delimited_file<P: AsRef<Path>>(
    path: P,
    delimiter: char,
    header: bool,
) -> Result<(Vec<Vec<String>>, Option<Vec<String>>), SorrelError> {
    let file = File::open(&path).map_err(|err| SorrelError::NoFileError(err.to_string()))?;

    let mut rows = Vec::new();
    let mut headline = None;

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| SorrelError::NoFileError(err.to_string()))?;

        if header && idx == 0 {
            headline = Some(line.split(delimiter).map(str::to_string).collect());
            continue;
        }

        let tokens: Vec<String> = line
            .split(delimiter)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        if !tokens.is_empty() {
            rows.push(tokens);
        }
    }

    Ok((rows, headline))
}

#[cfg(test)]
mod test {

    use super::*;
    use std::path::PathBuf;

    fn scratch_file(tag: &str, contents: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("sorrel_records_{}_{}.txt", tag, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_read_rows() {
        let path = scratch_file("rows", "a/b.png 1 10 10 50 50 2\n\nc.png 0\n");

        let (rows, header) = read_delimited_file(&path, ' ', false).unwrap();

        assert!(header.is_none());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 7);
        assert_eq!(rows[0][0], "a/b.png");
        assert_eq!(rows[1], vec!["c.png", "0"]);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_read_header() {
        let path = scratch_file("header", "path count boxes\nimg.png 0\n");

        let (rows, header) = read_delimited_file(&path, ' ', true).unwrap();

        assert_eq!(header.unwrap(), vec!["path", "count", "boxes"]);
        assert_eq!(rows.len(), 1);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_repeated_delimiters() {
        let path = scratch_file("repeat", "img.png  0 \n");

        let (rows, _) = read_delimited_file(&path, ' ', false).unwrap();

        assert_eq!(rows[0], vec!["img.png", "0"]);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let missing = read_delimited_file("does_not_exist.txt", ' ', false);
        assert!(missing.is_err());
    }
}
