//! Opening the MBOX stream: a plain file, stdin, or a member of a ZIP
//! archive (Google Takeout style), optionally extracted to disk first.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::info;

use super::mbox::MboxParser;
use crate::error::{MboxError, Result};

/// Where the MBOX data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    /// Read the MBOX stream from standard input.
    Stdin,
    /// A plain MBOX file on disk.
    Mbox(PathBuf),
    /// An MBOX stored inside a ZIP archive.
    Zip {
        zip: PathBuf,
        member: String,
        /// Extract the member here first, then read the extracted file.
        extract_to: Option<PathBuf>,
    },
}

impl ArchiveSource {
    /// Decide which source the given paths describe.
    ///
    /// An existing MBOX file wins and the ZIP arguments are ignored. Otherwise
    /// both the ZIP and the in-archive path must be given; a non-existing MBOX
    /// path then names the extraction target.
    pub fn resolve(mbox: Option<&Path>, zip: Option<&Path>, member: Option<&str>) -> Result<Self> {
        if let Some(path) = mbox {
            if path == Path::new("-") {
                return Ok(Self::Stdin);
            }
            if path.is_file() {
                return Ok(Self::Mbox(path.to_path_buf()));
            }
        }

        match (zip, member) {
            (Some(zip), Some(member)) => {
                if !zip.is_file() {
                    return Err(MboxError::FileNotFound(zip.to_path_buf()));
                }
                Ok(Self::Zip {
                    zip: zip.to_path_buf(),
                    member: member.to_string(),
                    extract_to: mbox.map(Path::to_path_buf),
                })
            }
            _ => Err(MboxError::InvalidSource(
                "either the MBOX path must be an existing file or both the ZIP file \
                 and the MBOX path inside it must be specified"
                    .to_string(),
            )),
        }
    }

    /// Stream every message of the source through `parser`.
    ///
    /// Callback semantics are those of [`MboxParser::parse`].
    pub fn for_each_message(
        &self,
        parser: &MboxParser,
        message_callback: &mut dyn FnMut(u64, &[u8]) -> bool,
        progress_callback: Option<&dyn Fn(u64, Option<u64>)>,
    ) -> Result<u64> {
        match self {
            Self::Stdin => {
                let stdin = std::io::stdin();
                let reader = BufReader::with_capacity(parser.read_buffer_size(), stdin.lock());
                parser.parse(reader, "<stdin>", None, message_callback, progress_callback)
            }
            Self::Mbox(path) => parse_file(path, parser, message_callback, progress_callback),
            Self::Zip {
                zip,
                member,
                extract_to,
            } => {
                let mut archive = open_zip(zip)?;
                let mut entry = archive.by_name(member).map_err(|e| MboxError::Archive {
                    path: zip.clone(),
                    reason: format!("{member}: {e}"),
                })?;

                if let Some(dest) = extract_to {
                    extract_entry(&mut entry, dest)?;
                    info!(
                        zip = %zip.display(),
                        member = member.as_str(),
                        dest = %dest.display(),
                        "Extracted MBOX from archive"
                    );
                    drop(entry);
                    return parse_file(dest, parser, message_callback, progress_callback);
                }

                let total = entry.size();
                let label = format!("{}:{member}", zip.display());
                let reader = BufReader::with_capacity(parser.read_buffer_size(), entry);
                parser.parse(reader, &label, Some(total), message_callback, progress_callback)
            }
        }
    }
}

impl fmt::Display for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "<stdin>"),
            Self::Mbox(path) => write!(f, "{}", path.display()),
            Self::Zip { zip, member, .. } => write!(f, "{}:{member}", zip.display()),
        }
    }
}

fn parse_file(
    path: &Path,
    parser: &MboxParser,
    message_callback: &mut dyn FnMut(u64, &[u8]) -> bool,
    progress_callback: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<u64> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MboxError::FileNotFound(path.to_path_buf())
        } else {
            MboxError::io(path, e)
        }
    })?;
    let total = file.metadata().map_err(|e| MboxError::io(path, e))?.len();
    let reader = BufReader::with_capacity(parser.read_buffer_size(), file);
    parser.parse(
        reader,
        &path.display().to_string(),
        Some(total),
        message_callback,
        progress_callback,
    )
}

fn open_zip(path: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(path).map_err(|e| MboxError::io(path, e))?;
    zip::ZipArchive::new(file).map_err(|e| MboxError::Archive {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn extract_entry(entry: &mut impl Read, dest: &Path) -> Result<()> {
    let mut out = File::create(dest).map_err(|e| MboxError::io(dest, e))?;
    std::io::copy(entry, &mut out).map_err(|e| MboxError::io(dest, e))?;
    Ok(())
}
