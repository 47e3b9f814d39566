use std::{
    fs, io,
    path::{Path, PathBuf},
    vec,
};

#[derive(thiserror::Error, Debug)]
pub enum ParseDirError<E> {
    /// An error occurred during file system operations (reading directory, reading file)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An error occurred while deserializing the content
    #[error("Parsing error in file: {0}")]
    FileParse(E),

    /// The path provided was not a valid directory
    #[error("Invalid path: {0}")]
    PathError(String),

    #[error("Could not determine file stem for path: {0}")]
    StemError(PathBuf),
}

// Reads and parses the matching files of a directory one at a time, in file name order.
pub struct ParseDirIterator<F> {
    paths: vec::IntoIter<PathBuf>,
    parser: F,
}

impl<T, F, E> Iterator for ParseDirIterator<F>
where
    F: Fn(&Path, &str) -> Result<T, E>,
{
    // The item is a Result, allowing the user to handle parsing errors file-by-file
    type Item = Result<(String, T), ParseDirError<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;

        let file_stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => return Some(Err(ParseDirError::StemError(path))),
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => return Some(Err(ParseDirError::Io(e))),
        };

        tracing::trace!("parsing {}", path.display());
        Some(
            (self.parser)(&path, &contents)
                .map(|data| (file_stem, data))
                .map_err(ParseDirError::FileParse),
        )
    }
}

/// Returns an iterator over the parsed files in a directory whose extension is one of `extensions`.
pub fn parse<T, F, E>(
    dir_path: &Path,
    extensions: &[&str],
    parser: F,
) -> Result<ParseDirIterator<F>, ParseDirError<E>>
where
    F: Fn(&Path, &str) -> Result<T, E>,
{
    if !dir_path.is_dir() {
        return Err(ParseDirError::PathError(format!(
            "Path '{}' is not a directory.",
            dir_path.display()
        )));
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if path.is_file() && matches {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(ParseDirIterator {
        paths: paths.into_iter(),
        parser,
    })
}
