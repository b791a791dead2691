use std::error::Error as StdError;
use std::fmt;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error")]
    Config(#[from] ConfigError),

    #[error("message error")]
    Message(#[from] MessageError),

    #[error("address error")]
    Address(#[from] AddressError),

    #[error("store error")]
    Store(#[from] StoreError),

    #[error("send error")]
    Send(#[from] SendError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("couldn't read {path}")]
    Read { path: String, source: io::Error },

    #[error("couldn't parse {path}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error(transparent)]
    Parse(#[from] mailparse::MailParseError),

    #[error("message has no {0} header")]
    MissingHeader(&'static str),

    #[error("message has no text/plain body")]
    NoPlainBody,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("no '+' in {0:?}")]
    NoPlus(String),

    #[error("no '@' after '+' in {0:?}")]
    NoAt(String),

    #[error("empty identifier in {0:?}")]
    Empty(String),

    #[error("identifier {0:?} is not urlsafe")]
    NotUrlsafe(String),

    #[error("couldn't parse address {0:?}")]
    Unparseable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("no subscriber update for {0}")]
    UpdateNotFound(String),

    #[error("malformed subscriber line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("couldn't decode update {key}")]
    Decode {
        key: String,
        source: toml::de::Error,
    },

    #[error("couldn't encode update {key}")]
    Encode {
        key: String,
        source: toml::ser::Error,
    },

    #[error("couldn't archive message: {0}")]
    Archive(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("{0:?} is not a valid address")]
    InvalidAddress(String),

    #[error(transparent)]
    Parse(#[from] mailparse::MailParseError),

    #[error("couldn't spawn sendmail: {0}")]
    Spawn(io::Error),

    #[error("couldn't talk to sendmail: {0}")]
    Pipe(io::Error),

    #[error("unexpected response from sendmail: '{0}'")]
    Unexpected(String),
}

/// Writes an error followed by each of its causes.
pub struct Chain<'a>(pub &'a dyn StdError);

impl fmt::Display for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut current = self.0.source();
        while let Some(cause) = current {
            write!(f, "\n\tcaused by: {}", cause)?;
            current = cause.source();
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{AddressError, Chain, ConfigError, Error};
    use std::io;

    #[test]
    fn chain_lists_causes() {
        let err = Error::from(AddressError::NoPlus("a@b".to_string()));
        assert_eq!(
            Chain(&err).to_string(),
            "address error\n\tcaused by: no '+' in \"a@b\""
        );
    }

    #[test]
    fn chain_names_each_cause_once() {
        let err = Error::from(ConfigError::Read {
            path: "lists/pif/config.toml".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        });
        assert_eq!(
            Chain(&err).to_string(),
            "configuration error\n\tcaused by: couldn't read lists/pif/config.toml\n\tcaused by: no such file"
        );
    }
}
