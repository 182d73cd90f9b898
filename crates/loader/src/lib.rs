//! URL source loading.
//!
//! Reads the one-URL-per-line file produced during pre-processing and turns
//! it into a `DocumentMap`. Sources may be plain text, gzip or xz; the
//! format is sniffed from the leading bytes unless given explicitly.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use flate2::read::MultiGzDecoder;
use thiserror::Error;
use tracing::{debug, info};
use urlrescore_features::normalize_url;
use urlrescore_model::DocumentMap;
use xz2::read::XzDecoder;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];

/// Errors from reading a line source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Compression format of a line source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    /// Detect from the leading bytes
    #[default]
    Auto,
    Plain,
    Gzip,
    Xz,
}

impl Compression {
    /// Guess the format from the first bytes of a stream.
    pub fn detect(header: &[u8]) -> Self {
        if header.starts_with(XZ_MAGIC) {
            Self::Xz
        } else if header.starts_with(GZIP_MAGIC) {
            Self::Gzip
        } else {
            Self::Plain
        }
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "plain" => Ok(Self::Plain),
            "gzip" | "gz" => Ok(Self::Gzip),
            "xz" => Ok(Self::Xz),
            other => Err(format!("unknown compression: {}", other)),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Plain => "plain",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
        };
        f.write_str(name)
    }
}

/// Loader configuration.
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Compression of the URL source
    pub compression: Compression,
}

/// Wrap a raw byte stream in the right decoder.
///
/// In `Auto` mode up to six bytes are read ahead to pick the format, then
/// replayed in front of the rest of the stream.
pub fn open_reader<'a, R: Read + 'a>(
    mut reader: R,
    compression: Compression,
) -> io::Result<Box<dyn BufRead + 'a>> {
    let mut header = Vec::with_capacity(XZ_MAGIC.len());
    let compression = match compression {
        Compression::Auto => {
            (&mut reader)
                .take(XZ_MAGIC.len() as u64)
                .read_to_end(&mut header)?;
            Compression::detect(&header)
        }
        explicit => explicit,
    };
    debug!(%compression, "opening line source");

    let reader = io::Cursor::new(header).chain(reader);
    Ok(match compression {
        Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(reader))),
        Compression::Xz => Box::new(BufReader::new(XzDecoder::new_multi_decoder(reader))),
        Compression::Plain | Compression::Auto => Box::new(BufReader::new(reader)),
    })
}

/// Open a file as a line source.
pub fn open_path(path: &Path, compression: Compression) -> Result<Box<dyn BufRead>, LoadError> {
    let open_err = |source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(open_err)?;
    open_reader(file, compression).map_err(open_err)
}

/// Build a document map from URL lines.
///
/// Every line gets the next id, blank lines included. `\n`, `\r\n` and a
/// lone `\r` all end a line.
pub fn load_urls<R: BufRead>(mut reader: R) -> Result<DocumentMap, LoadError> {
    let mut map = DocumentMap::new();
    let mut chunk = Vec::new();
    loop {
        chunk.clear();
        let next_line = map.len() + 1;
        let read = reader
            .read_until(b'\n', &mut chunk)
            .map_err(|source| LoadError::Read { line: next_line, source })?;
        if read == 0 {
            break;
        }
        let text = std::str::from_utf8(&chunk).map_err(|err| LoadError::Read {
            line: next_line,
            source: io::Error::new(io::ErrorKind::InvalidData, err),
        })?;
        for line in split_lines(text) {
            map.push(normalize_url(line));
        }
    }
    Ok(map)
}

/// Split a `\n`-terminated chunk on carriage returns.
fn split_lines(chunk: &str) -> std::str::Split<'_, char> {
    let body = match chunk.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => chunk.strip_suffix('\r').unwrap_or(chunk),
    };
    body.split('\r')
}

/// Load the URL source at `path`.
pub fn load_path(path: &Path, config: &LoaderConfig) -> Result<DocumentMap, LoadError> {
    let reader = open_path(path, config.compression)?;
    let map = load_urls(reader)?;
    info!(path = %path.display(), documents = map.len(), "loaded URL map");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const URLS: &str = "http://x.com/p1\n\nhttp://x.com/p1/p2\n";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn xz(data: &[u8]) -> Vec<u8> {
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn urls(map: &DocumentMap) -> Vec<(u64, &str)> {
        map.iter().collect()
    }

    #[test]
    fn test_load_plain() {
        let map = load_urls(URLS.as_bytes()).unwrap();
        assert_eq!(urls(&map), vec![(1, "/p1"), (2, ""), (3, "/p1/p2")]);
    }

    #[test]
    fn test_duplicates_and_unprefixed_lines() {
        let map = load_urls("https://a.org/x\r\nhttps://b.org/x\n  local/path \n".as_bytes()).unwrap();
        assert_eq!(urls(&map), vec![(1, "/x"), (2, "/x"), (3, "local/path")]);
    }

    #[test]
    fn test_bare_carriage_return_ends_line() {
        let map = load_urls("http://a.com/x\rhttp://a.com/y\n".as_bytes()).unwrap();
        assert_eq!(urls(&map), vec![(1, "/x"), (2, "/y")]);
    }

    #[test]
    fn test_mixed_line_endings() {
        let map = load_urls("/a\r\n/b\r/c\n\r/d\r".as_bytes()).unwrap();
        assert_eq!(urls(&map), vec![(1, "/a"), (2, "/b"), (3, "/c"), (4, ""), (5, "/d")]);
    }

    #[test]
    fn test_empty_source() {
        assert!(load_urls(io::empty()).unwrap().is_empty());
    }

    #[test]
    fn test_detect() {
        assert_eq!(Compression::detect(&gzip(b"x")), Compression::Gzip);
        assert_eq!(Compression::detect(&xz(b"x")), Compression::Xz);
        assert_eq!(Compression::detect(b"http://"), Compression::Plain);
        assert_eq!(Compression::detect(b""), Compression::Plain);
    }

    #[test]
    fn test_auto_gzip() {
        let reader = open_reader(io::Cursor::new(gzip(URLS.as_bytes())), Compression::Auto).unwrap();
        let map = load_urls(reader).unwrap();
        assert_eq!(urls(&map), vec![(1, "/p1"), (2, ""), (3, "/p1/p2")]);
    }

    #[test]
    fn test_auto_xz() {
        let reader = open_reader(io::Cursor::new(xz(URLS.as_bytes())), Compression::Auto).unwrap();
        assert_eq!(load_urls(reader).unwrap().len(), 3);
    }

    #[test]
    fn test_auto_plain_short_input() {
        let reader = open_reader("/a".as_bytes(), Compression::Auto).unwrap();
        let map = load_urls(reader).unwrap();
        assert_eq!(urls(&map), vec![(1, "/a")]);
    }

    #[test]
    fn test_explicit_plain_keeps_bytes() {
        let reader = open_reader(io::Cursor::new(gzip(b"x")), Compression::Plain).unwrap();
        // Gzip bytes are not valid UTF-8 lines
        assert!(matches!(load_urls(reader), Err(LoadError::Read { line: 1, .. })));
    }

    #[test]
    fn test_invalid_utf8_reports_line() {
        let data: &[u8] = b"http://x.com/ok\n\xff\xfe\n";
        assert!(matches!(load_urls(data), Err(LoadError::Read { line: 2, .. })));
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!("GZ".parse::<Compression>(), Ok(Compression::Gzip));
        assert_eq!("xz".parse::<Compression>(), Ok(Compression::Xz));
        assert_eq!("auto".parse::<Compression>(), Ok(Compression::Auto));
        assert!("zip".parse::<Compression>().is_err());
        assert!("none".parse::<Compression>().is_err());
        assert_eq!(Compression::Gzip.to_string(), "gzip");
    }

    #[test]
    fn test_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.gz");
        std::fs::write(&path, gzip(URLS.as_bytes())).unwrap();

        let map = load_path(&path, &LoaderConfig::default()).unwrap();
        assert_eq!(map.lookup(3), Ok("/p1/p2"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let err = load_path(&path, &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
        assert!(err.to_string().contains("missing.txt"));
    }
}
