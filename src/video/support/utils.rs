use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::video::error::PipelineError;

/// Canonical path of an input that must already exist.
pub fn canonicalize_existing(path: &Path, role: &str) -> Result<PathBuf, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::validation(format!(
            "{role} {} does not exist",
            path.display()
        )));
    }
    Ok(path.canonicalize()?)
}

/// Delete a previous output so encoders always write a fresh file.
pub fn remove_stale_output(path: &Path) -> Result<(), PipelineError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

const SAMPLE_SIZE: usize = 64 * 1024;
const SAMPLE_COUNT: u64 = 64;

/// Content hash used to key cached transcripts.
///
/// Small files are hashed whole; larger ones are hashed from evenly spaced
/// samples plus their length, which is enough to tell uploads apart.
pub fn compute_file_hash(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let file_size = file.metadata()?.len();

    let mut hasher = Sha256::new();
    hasher.update(file_size.to_le_bytes());

    if file_size <= SAMPLE_SIZE as u64 * SAMPLE_COUNT {
        io::copy(&mut file, &mut hasher)?;
    } else {
        let mut buffer = vec![0u8; SAMPLE_SIZE];
        let step = (file_size - SAMPLE_SIZE as u64) / (SAMPLE_COUNT - 1);
        for i in 0..SAMPLE_COUNT {
            file.seek(SeekFrom::Start(step * i))?;
            file.read_exact(&mut buffer)?;
            hasher.update(&buffer);
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}
