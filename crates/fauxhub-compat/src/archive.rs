//! Archive generation for repository downloads.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{CompatError, Result};

/// Archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Gzipped tar archive.
    TarGz,
    /// Zip archive.
    Zip,
}

impl ArchiveFormat {
    /// Parses the codeload URL format segment (`zip` | `tar.gz`).
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "zip" | "legacy.zip" => Some(Self::Zip),
            "tar.gz" | "legacy.tar.gz" => Some(Self::TarGz),
            _ => None,
        }
    }

    /// The format segment used in codeload URLs.
    pub fn segment(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }

    /// Content type for the download response.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::TarGz => "application/x-gzip",
            Self::Zip => "application/zip",
        }
    }

    /// Extension of the generated file.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => ".tgz",
            Self::Zip => ".zip",
        }
    }
}

/// An entry to include in an archive.
#[derive(Debug, Clone)]
pub enum ArchiveEntry {
    /// A regular file with its bytes and unix mode.
    File {
        path: String,
        content: Vec<u8>,
        mode: u32,
    },
    /// An explicit directory record (also used for submodules).
    Dir { path: String },
}

impl ArchiveEntry {
    /// A regular (non-executable) file entry.
    pub fn file(path: impl Into<String>, content: Vec<u8>) -> Self {
        Self::File {
            path: path.into(),
            content,
            mode: 0o644,
        }
    }

    /// A file entry with an explicit mode.
    pub fn file_with_mode(path: impl Into<String>, content: Vec<u8>, mode: u32) -> Self {
        Self::File {
            path: path.into(),
            content,
            mode,
        }
    }

    /// A directory record.
    pub fn dir(path: impl Into<String>) -> Self {
        Self::Dir { path: path.into() }
    }
}

fn prefixed(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{prefix}/{path}")
    }
}

/// Builder for tar.gz archives (gzip level 9).
pub struct TarGzBuilder {
    entries: Vec<ArchiveEntry>,
    prefix: String,
}

impl TarGzBuilder {
    pub fn new(prefix: String) -> Self {
        Self {
            entries: Vec::new(),
            prefix,
        }
    }

    pub fn add(&mut self, entry: ArchiveEntry) {
        self.entries.push(entry);
    }

    pub fn build(self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = GzEncoder::new(&mut buffer, Compression::new(9));
        let mut tar = tar::Builder::new(encoder);

        for entry in self.entries {
            match entry {
                ArchiveEntry::File {
                    path,
                    content,
                    mode,
                } => {
                    let mut header = tar::Header::new_gnu();
                    header.set_size(content.len() as u64);
                    header.set_mode(mode);
                    header.set_mtime(0);
                    header.set_cksum();
                    tar.append_data(
                        &mut header,
                        prefixed(&self.prefix, &path),
                        content.as_slice(),
                    )
                    .map_err(|e| CompatError::Archive(e.to_string()))?;
                }
                ArchiveEntry::Dir { path } => {
                    let mut header = tar::Header::new_gnu();
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_size(0);
                    header.set_mode(0o755);
                    header.set_mtime(0);
                    header.set_cksum();
                    let name = format!("{}/", prefixed(&self.prefix, &path));
                    tar.append_data(&mut header, name, std::io::empty())
                        .map_err(|e| CompatError::Archive(e.to_string()))?;
                }
            }
        }

        tar.into_inner()
            .map_err(|e| CompatError::Archive(e.to_string()))?
            .finish()
            .map_err(|e| CompatError::Archive(e.to_string()))?;

        Ok(buffer)
    }
}

/// Builder for zip archives (deflate level 9).
pub struct ZipBuilder {
    entries: Vec<ArchiveEntry>,
    prefix: String,
}

impl ZipBuilder {
    pub fn new(prefix: String) -> Self {
        Self {
            entries: Vec::new(),
            prefix,
        }
    }

    pub fn add(&mut self, entry: ArchiveEntry) {
        self.entries.push(entry);
    }

    pub fn build(self) -> Result<Vec<u8>> {
        use std::io::Cursor;
        use zip::write::SimpleFileOptions;
        use zip::ZipWriter;

        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(9));

        for entry in self.entries {
            match entry {
                ArchiveEntry::File {
                    path,
                    content,
                    mode,
                } => {
                    zip.start_file(
                        prefixed(&self.prefix, &path),
                        options.unix_permissions(mode),
                    )
                    .map_err(|e| CompatError::Archive(e.to_string()))?;
                    zip.write_all(&content)
                        .map_err(|e| CompatError::Archive(e.to_string()))?;
                }
                ArchiveEntry::Dir { path } => {
                    zip.add_directory(
                        prefixed(&self.prefix, &path),
                        options.unix_permissions(0o755),
                    )
                    .map_err(|e| CompatError::Archive(e.to_string()))?;
                }
            }
        }

        zip.finish()
            .map_err(|e| CompatError::Archive(e.to_string()))?;

        Ok(buffer.into_inner())
    }
}

/// Creates an archive from entries, in the order given.
pub fn create_archive(
    format: ArchiveFormat,
    prefix: String,
    entries: Vec<ArchiveEntry>,
) -> Result<Vec<u8>> {
    match format {
        ArchiveFormat::TarGz => {
            let mut builder = TarGzBuilder::new(prefix);
            for entry in entries {
                builder.add(entry);
            }
            builder.build()
        }
        ArchiveFormat::Zip => {
            let mut builder = ZipBuilder::new(prefix);
            for entry in entries {
                builder.add(entry);
            }
            builder.build()
        }
    }
}

/// The on-disk and Content-Disposition name of an archive:
/// `<owner>-<repo>-<commit-or-SNAPSHOT>.<ext>`.
pub fn archive_file_name(
    owner: &str,
    repo: &str,
    commit: Option<&str>,
    format: ArchiveFormat,
) -> String {
    format!(
        "{owner}-{repo}-{}{}",
        commit.unwrap_or("SNAPSHOT"),
        format.extension()
    )
}
