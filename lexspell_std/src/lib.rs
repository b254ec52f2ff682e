//! File access around the lookup engine: reading `.aff`/`.dic` pairs from
//! disk or zipped archives, locating installed dictionaries, and decoding
//! their bytes into the lines the core readers consume.

use std::fs;
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use lexspell_core::{parse_aff, parse_dic, CheckParams, Lookup, ParseNote};

#[derive(Debug, Error)]
pub enum DictError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("archive {path}: {source}")]
    Zip {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("no .aff/.dic pair inside {0}")]
    NoPair(String),
    #[error("dictionary {0} not found in the system paths")]
    NotFound(String),
}

/// Directories where installed spelling dictionaries conventionally live.
const SYSTEM_PATHS: [&str; 5] = [
    "/usr/share/hunspell",
    "/usr/share/myspell",
    "/usr/share/myspell/dicts",
    "/Library/Spelling",
    "/opt/openoffice.org/basis3.0/share/dict/ooo",
];

/// A loaded dictionary: the engine plus whatever the readers had to say
/// about the files.
pub struct Dictionary {
    dct_lookup: Lookup,
    dct_notes: Vec<ParseNote>,
}

impl Dictionary {
    /// Loads `base.aff` and `base.dic`.
    pub fn from_files(base: &str) -> Result<Dictionary, DictError> {
        let aff_path = format!("{}.aff", base);
        let dic_path = format!("{}.dic", base);
        let aff_bytes = fs::read(&aff_path).map_err(|source| DictError::Io {
            path: aff_path,
            source,
        })?;
        let dic_bytes = fs::read(&dic_path).map_err(|source| DictError::Io {
            path: dic_path,
            source,
        })?;
        Ok(Self::from_bytes(&aff_bytes, &dic_bytes))
    }

    /// Loads the single `.aff`/`.dic` pair inside a zip archive
    /// (`.xpi` and `.odt` dictionary bundles are such archives).
    pub fn from_zip(path: &str) -> Result<Dictionary, DictError> {
        let file = fs::File::open(path).map_err(|source| DictError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut archive = zip::ZipArchive::new(file).map_err(|source| DictError::Zip {
            path: path.to_string(),
            source,
        })?;
        let aff_name = Self::member_with_extension(&archive, ".aff")
            .ok_or_else(|| DictError::NoPair(path.to_string()))?;
        let dic_name = Self::member_with_extension(&archive, ".dic")
            .ok_or_else(|| DictError::NoPair(path.to_string()))?;
        let aff_bytes = Self::read_member(&mut archive, path, &aff_name)?;
        let dic_bytes = Self::read_member(&mut archive, path, &dic_name)?;
        Ok(Self::from_bytes(&aff_bytes, &dic_bytes))
    }

    /// Finds `name.aff` in the conventional directories.
    pub fn from_system(name: &str) -> Result<Dictionary, DictError> {
        for dir in SYSTEM_PATHS {
            let base = format!("{}/{}", dir, name);
            if Path::new(&format!("{}.aff", base)).exists() {
                return Self::from_files(&base);
            }
        }
        Err(DictError::NotFound(name.to_string()))
    }

    /// Builds a dictionary from already-decoded file contents.
    pub fn from_sources(aff_text: &str, dic_text: &str) -> Dictionary {
        Self::from_bytes(aff_text.as_bytes(), dic_text.as_bytes())
    }

    fn from_bytes(aff_bytes: &[u8], dic_bytes: &[u8]) -> Dictionary {
        let aff_lines = decode_lines(aff_bytes);
        let (aff, mut notes) = parse_aff(aff_lines.iter().map(|l| l.as_str()));
        let dic_lines = decode_lines(dic_bytes);
        let (dic, dic_notes) = parse_dic(&aff, dic_lines.iter().map(|l| l.as_str()));
        notes.extend(dic_notes);
        debug!(notes = notes.len(), "dictionary loaded");
        Dictionary {
            dct_lookup: Lookup::new(aff, dic),
            dct_notes: notes,
        }
    }

    fn member_with_extension<R: Read + std::io::Seek>(
        archive: &zip::ZipArchive<R>,
        extension: &str,
    ) -> Option<String> {
        archive
            .file_names()
            .find(|name| name.ends_with(extension))
            .map(|name| name.to_string())
    }

    fn read_member<R: Read + std::io::Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        name: &str,
    ) -> Result<Vec<u8>, DictError> {
        let mut member = archive.by_name(name).map_err(|source| DictError::Zip {
            path: path.to_string(),
            source,
        })?;
        let mut bytes = vec![];
        member.read_to_end(&mut bytes).map_err(|source| DictError::Io {
            path: format!("{}:{}", path, name),
            source,
        })?;
        Ok(bytes)
    }

    pub fn check(&self, word: &str) -> bool {
        self.dct_lookup.check(word)
    }

    pub fn check_with(&self, word: &str, params: &CheckParams) -> bool {
        self.dct_lookup.check_with(word, params)
    }

    pub fn lookup(&self) -> &Lookup {
        &self.dct_lookup
    }

    pub fn notes(&self) -> &[ParseNote] {
        &self.dct_notes
    }
}

/// Splits file bytes into lines, decoding each as UTF-8 with a Latin-1
/// fallback for the older 8-bit dictionaries.
fn decode_lines(bytes: &[u8]) -> Vec<String> {
    let mut lines = vec![];
    for raw in bytes.split(|&b| b == b'\n') {
        let raw = match raw.last() {
            Some(&b'\r') => &raw[..raw.len() - 1],
            _ => raw,
        };
        match std::str::from_utf8(raw) {
            Ok(text) => lines.push(text.to_string()),
            Err(_) => lines.push(raw.iter().map(|&b| b as char).collect()),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_fallback_per_line() {
        let mut bytes = "SET ISO8859-1\n".as_bytes().to_vec();
        bytes.extend([b'T', b'R', b'Y', b' ', 0xe9, b'\n']);
        let lines = decode_lines(&bytes);
        assert_eq!(lines[0], "SET ISO8859-1");
        assert_eq!(lines[1], "TRY é");
    }

    #[test]
    fn sources_round_trip() {
        let dict = Dictionary::from_sources(
            "SET UTF-8\nSFX S Y 1\nSFX S 0 s .\n",
            "1\nword/S\n",
        );
        assert!(dict.check("word"));
        assert!(dict.check("words"));
        assert!(!dict.check("wordss"));
        assert!(dict.notes().is_empty());
    }

    #[test]
    fn missing_files_error() {
        let result = Dictionary::from_files("/nonexistent/path/xx");
        assert!(matches!(result, Err(DictError::Io { .. })));
        let result = Dictionary::from_system("xx_XX-none");
        assert!(matches!(result, Err(DictError::NotFound(_))));
    }
}
