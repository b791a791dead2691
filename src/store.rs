use crate::directive::{Status, SubscriberRecord};
use crate::err::StoreError;
use fs2::FileExt;
use maildir::Maildir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, rename, DirBuilder, File, OpenOptions};
use std::io::prelude::*;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

/// A stored reply to an update request. Whatever created the record may keep its own fields in
/// it; they are carried through untouched.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct SubscriberUpdate {
    #[serde(skip)]
    pub key: String,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub extra: toml::Table,
}

pub trait SubscriberStore {
    fn upsert(&self, record: &SubscriberRecord) -> Result<(), StoreError>;
    fn subscribers(&self) -> Result<Vec<SubscriberRecord>, StoreError>;
    fn update(&self, key: &str) -> Result<SubscriberUpdate, StoreError>;
    fn save_update(&self, update: &SubscriberUpdate) -> Result<(), StoreError>;
}

const SUBSCRIBERS_LOCK: &str = "subscribers.lock";
const UPDATES_LOCK: &str = "updates.lock";

pub struct Directory {
    maildir: Maildir,
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Directory {{ path: {:?} }}", self.maildir.path())
    }
}

impl Directory {
    pub fn open<P: AsRef<Path>>(dirname: P) -> Directory {
        Directory {
            maildir: Maildir::from(dirname.as_ref().to_path_buf()),
        }
    }

    fn path(&self) -> &Path {
        self.maildir.path()
    }

    fn subscribers_path(&self) -> PathBuf {
        self.path().join("subscribers")
    }

    fn update_path(&self, key: &str) -> PathBuf {
        self.path().join("updates").join(format!("{}.toml", key))
    }

    /// `subscribers` and the update records are replaced by rename, so they can't carry their
    /// own locks. Each gets a sidecar lock file in the top directory instead.
    fn lock_file(&self, name: &str) -> Result<File, StoreError> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(self.path().join(name))?)
    }

    fn read_subscribers(&self) -> Result<Vec<SubscriberRecord>, StoreError> {
        let file = match File::open(self.subscribers_path()) {
            Ok(file) => file,
            Err(err) => {
                return match err.kind() {
                    ErrorKind::NotFound => Ok(Vec::new()),
                    _ => Err(err.into()),
                }
            }
        };

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(parse_record(idx + 1, &line)?);
        }
        Ok(records)
    }

    pub fn archive(&self, message: &[u8]) -> Result<String, StoreError> {
        self.maildir.create_dirs()?;
        self.maildir
            .store_new(message)
            .map_err(|e| StoreError::Archive(e.to_string()))
    }
}

fn parse_record(line: usize, text: &str) -> Result<SubscriberRecord, StoreError> {
    let malformed = |reason: String| StoreError::Malformed { line, reason };
    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != 5 {
        return Err(malformed(format!("{} fields", fields.len())));
    }
    Ok(SubscriberRecord {
        name: fields[0].to_string(),
        address: fields[1].to_string(),
        team: fields[2].to_string(),
        status: fields[3].parse::<Status>().map_err(malformed)?,
        role: fields[4].to_string(),
    })
}

fn format_record(r: &SubscriberRecord) -> String {
    format!("{},{},{},{},{}", r.name, r.address, r.team, r.status, r.role)
}

impl SubscriberStore for Directory {
    fn upsert(&self, record: &SubscriberRecord) -> Result<(), StoreError> {
        let lock = self.lock_file(SUBSCRIBERS_LOCK)?;
        lock.lock_exclusive()?;

        let mut records = self.read_subscribers()?;
        match records
            .iter_mut()
            .find(|r| r.has_identity(&record.name, &record.address, &record.team))
        {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }

        let new_name = self.path().join("subscribers.new");
        let mut newsubs = File::create(&new_name)?;
        for r in &records {
            writeln!(&mut newsubs, "{}", format_record(r))?;
        }
        newsubs.sync_data()?;
        rename(new_name, self.subscribers_path())?;

        lock.unlock()?;
        Ok(())
    }

    fn subscribers(&self) -> Result<Vec<SubscriberRecord>, StoreError> {
        let lock = self.lock_file(SUBSCRIBERS_LOCK)?;
        lock.lock_shared()?;
        let records = self.read_subscribers()?;
        lock.unlock()?;
        Ok(records)
    }

    fn update(&self, key: &str) -> Result<SubscriberUpdate, StoreError> {
        let lock = self.lock_file(UPDATES_LOCK)?;
        lock.lock_shared()?;
        let read = fs::read_to_string(self.update_path(key));
        lock.unlock()?;

        let contents = match read {
            Ok(contents) => contents,
            Err(err) => {
                return match err.kind() {
                    ErrorKind::NotFound => Err(StoreError::UpdateNotFound(key.to_string())),
                    _ => Err(err.into()),
                }
            }
        };
        let mut update: SubscriberUpdate =
            toml::from_str(&contents).map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            })?;
        update.key = key.to_string();
        Ok(update)
    }

    fn save_update(&self, update: &SubscriberUpdate) -> Result<(), StoreError> {
        let contents = toml::to_string(update).map_err(|source| StoreError::Encode {
            key: update.key.clone(),
            source,
        })?;

        let path = self.update_path(&update.key);
        let lock = self.lock_file(UPDATES_LOCK)?;
        lock.lock_exclusive()?;

        DirBuilder::new().recursive(true).create(self.path().join("updates"))?;
        let new_name = path.with_extension("toml.new");
        let mut new = File::create(&new_name)?;
        new.write_all(contents.as_bytes())?;
        new.sync_data()?;
        rename(new_name, &path)?;

        lock.unlock()?;
        Ok(())
    }
}

#[cfg(test)]
pub use self::memory::MemoryStore;
