/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Reading and writing the human-readable XML documents used by the file
//! registry and the staging catalogue.

use quick_xml::se::Serializer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

#[derive(Debug, Error)]
pub(crate) enum XmlFileError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("malformed XML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: quick_xml::DeError,
    },

    #[error("failed to serialize XML: {0}")]
    Serialize(quick_xml::DeError),
}

/// Read and deserialize `path`. A missing file yields `Ok(None)`.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, XmlFileError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(XmlFileError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    quick_xml::de::from_str(&content)
        .map(Some)
        .map_err(|source| XmlFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Serialize `value` under `root`, indented two spaces per level.
pub(crate) fn to_pretty_string<T: Serialize>(root: &str, value: &T) -> Result<String, XmlFileError> {
    let mut buffer = String::from(XML_DECLARATION);
    let mut serializer =
        Serializer::with_root(&mut buffer, Some(root)).map_err(XmlFileError::Serialize)?;
    serializer.indent(' ', 2);
    value.serialize(serializer).map_err(XmlFileError::Serialize)?;
    buffer.push('\n');
    Ok(buffer)
}

/// Serialize `value` and replace `path` with it.
///
/// The document goes to a temporary file in the same directory first and is
/// renamed over `path`, so readers of the file never see a partial write.
pub(crate) fn write_document<T: Serialize>(
    path: &Path,
    root: &str,
    value: &T,
) -> Result<(), XmlFileError> {
    let content = to_pretty_string(root, value)?;
    let write_err = |source: io::Error| XmlFileError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    staged.write_all(content.as_bytes()).map_err(write_err)?;
    staged.as_file().sync_all().map_err(write_err)?;
    staged.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Shelf {
        #[serde(rename = "book", default)]
        books: Vec<Book>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Book {
        #[serde(rename = "@title")]
        title: String,
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let result: Option<Shelf> = read_document(&temp_dir.path().join("absent.xml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_written_document_is_indented_and_readable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("shelf.xml");
        let shelf = Shelf {
            books: vec![
                Book {
                    title: "one".to_string(),
                },
                Book {
                    title: "two".to_string(),
                },
            ],
        };

        write_document(&path, "shelf", &shelf).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("<?xml"));
        assert!(raw.contains("\n  <book title=\"one\"/>"));

        let back: Shelf = read_document(&path).unwrap().unwrap();
        assert_eq!(back, shelf);
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.xml");
        fs::write(&path, "<shelf><book title=").unwrap();

        let err = read_document::<Shelf>(&path).unwrap_err();
        assert!(matches!(err, XmlFileError::Parse { .. }));
    }
}
