use crate::err::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Deserialize, Serialize, Debug)]
struct Root {
    config: Config,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub appname: String,
    /// Bare address used as From and Reply-To on outgoing mail.
    pub noreply: String,
    #[serde(default)]
    pub admins: Vec<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(dirname: P) -> Result<Config, ConfigError> {
        let config_path = dirname.as_ref().join("config.toml");
        let path = config_path.display().to_string();
        let contents = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let root: Root =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;
        root.config.validate()?;
        Ok(root.config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.appname.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "appname".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if !self.noreply.contains('@') {
            return Err(ConfigError::InvalidValue {
                key: "noreply".to_string(),
                message: format!("{:?} is not an address", self.noreply),
            });
        }
        Ok(())
    }

    pub fn identity(&self) -> String {
        format!("{} <{}>", self.appname, self.noreply)
    }
}

#[cfg(test)]
mod test {
    use super::{Config, Root};
    use crate::err::ConfigError;
    use std::error::Error;
    use std::fs::File;
    use std::io::Write;

    fn write_config(dir: &std::path::Path, config: Config) -> Result<(), Box<dyn Error>> {
        let mut file = File::create(dir.join("config.toml"))?;
        file.write_all(toml::to_string(&Root { config })?.as_bytes())?;
        Ok(())
    }

    #[test]
    fn test_create_load() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        write_config(
            dir.path(),
            Config {
                appname: "PIF".to_string(),
                noreply: "noreply@piffer.example".to_string(),
                admins: vec!["Admin@Example.com".to_string()],
            },
        )?;

        let config = Config::load(dir.path())?;
        assert_eq!(config.appname, "PIF");
        assert_eq!(config.admins, vec!["Admin@Example.com".to_string()]);
        assert_eq!(config.identity(), "PIF <noreply@piffer.example>");

        Ok(())
    }

    #[test]
    fn admins_default_to_empty() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut file = File::create(dir.path().join("config.toml"))?;
        file.write_all(b"[config]\nappname = \"PIF\"\nnoreply = \"noreply@piffer.example\"\n")?;

        assert!(Config::load(dir.path())?.admins.is_empty());
        Ok(())
    }

    #[test]
    fn rejects_bad_noreply() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        write_config(
            dir.path(),
            Config {
                appname: "PIF".to_string(),
                noreply: "nobody".to_string(),
                admins: vec![],
            },
        )?;

        match Config::load(dir.path()) {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "noreply"),
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn missing_file() {
        let dir = std::env::temp_dir().join("piffer-does-not-exist");
        assert!(matches!(
            Config::load(dir),
            Err(ConfigError::Read { .. })
        ));
    }
}
