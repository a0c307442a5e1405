// ABOUTME: Download handling for exported carousel artifacts
// ABOUTME: Hands finished files to the user by writing them into an output directory

use crate::errors::{CarouselError, Result};
use crate::utils::{ensure_directory_exists, validate_directory_writable};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Destination for exported files
pub trait Downloader {
    /// Save `bytes` under `filename`, returning where they ended up
    fn save(&mut self, filename: &str, mime: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Saves every download into one directory
#[derive(Debug, Clone)]
pub struct DirectoryDownloader {
    output_dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(output_dir: &Path) -> Result<Self> {
        ensure_directory_exists(output_dir)?;
        validate_directory_writable(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Downloader for DirectoryDownloader {
    fn save(&mut self, filename: &str, mime: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = Path::new(filename);
        if filename.is_empty() || name.file_name().map(|n| n != name.as_os_str()).unwrap_or(true) {
            return Err(CarouselError::InvalidResourcePath(format!(
                "Download name must be a plain file name: {:?}",
                filename
            )));
        }

        let target = self.output_dir.join(filename);
        fs::write(&target, bytes).map_err(CarouselError::FileReadError)?;
        info!("Saved {} ({}, {} bytes)", target.display(), mime, bytes.len());
        Ok(target)
    }
}
