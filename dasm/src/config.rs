use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

use crate::error::Error;

/// Listing options. Every key is optional in the YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Append `; OFFSET: BYTES` to each instruction line.
    pub comments: bool,
    /// Column the comment starts at.
    pub column: usize,
    pub label_prefix: String,
    /// Comment out every line from the first decode error on.
    pub taint_after_error: bool,
    /// Largest input accepted, in bytes.
    pub max_input: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            comments: true,
            column: 32,
            label_prefix: "label".to_string(),
            taint_after_error: true,
            max_input: 1 << 20,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let file = File::open(path).map_err(|e| Error::FileOpen(path.to_string(), e))?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|e| Error::Config(path.to_string(), e))
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        serde_yaml::from_str(text).map_err(|e| Error::Config("<inline>".to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let cfg = Config::parse("column: 40\nlabel_prefix: L\n").unwrap();
        assert_eq!(cfg.column, 40);
        assert_eq!(cfg.label_prefix, "L");
        assert!(cfg.comments);
        assert!(cfg.taint_after_error);
        assert_eq!(cfg.max_input, 1 << 20);
    }

    #[test]
    fn empty_document() {
        assert_eq!(Config::parse("{}").unwrap(), Config::default());
    }

    #[test]
    fn rejects_bad_types() {
        assert!(matches!(Config::parse("comments: maybe"), Err(Error::Config(..))));
    }
}
