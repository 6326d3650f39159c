//! A text file-backed implementation of the [`IpLedger`][super::IpLedger] trait.
//!
//! Keeps only the ledger's tail in memory, appending each observation to a file on disk as a
//! `<timestamp>,<address>` line.
use crate::error::Error;
use crate::ledger::{IpLedger, IpObservation};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// A file-backed IP ledger. Every append is written and synced to disk before the in-memory
/// tail is advanced, so a restart resumes from the last acknowledged address.
///
/// Only the last line of the file is loaded; earlier history stays on disk untouched.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileIpLedger {
    last: Option<IpObservation>,
    path: PathBuf,
}

impl FileIpLedger {
    /// Load a [`FileIpLedger`] from the ledger file at the given path, creating an empty file
    /// if none exists, or return an Error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptLedger`] if the last non-blank line of the file isn't a valid
    /// observation.
    ///
    /// Returns [`Error::IO`] if the path can't be read or created.
    pub async fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let path = p.as_ref().to_path_buf();
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    File::create(&path).await?;
                    String::new()
                }
                _ => return Err(Error::IO(err)),
            },
        };

        let last = contents
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(str::parse::<IpObservation>)
            .transpose()?;
        Ok(Self { last, path })
    }
}

#[async_trait::async_trait]
impl IpLedger for FileIpLedger {
    async fn read_last(&self) -> Result<Option<IpObservation>, Error> {
        Ok(self.last.clone())
    }

    async fn append(&mut self, observation: IpObservation) -> Result<(), Error> {
        let line = format!("{}\n", observation.to_line()?);
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;
        f.sync_data().await?;
        self.last = Some(observation);
        Ok(())
    }
}
