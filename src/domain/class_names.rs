// ============================================================
// Layer 3: Class Names
// ============================================================
// The class-name file lists one class per line, in label order:
//
//   Daffodil
//   Snowdrop
//   LilyValley
//   ...
//
// Only lines longer than two bytes count as class names, so
// blank lines and stray "\r" or "-" separators are ignored.
// The number of counted lines must equal the expected class
// count exactly; anything else is a startup error.

use std::path::PathBuf;

use thiserror::Error;

/// A line must be strictly longer than this to name a class.
const MIN_NAME_LEN: usize = 2;

#[derive(Debug, Error)]
pub enum ClassNamesError {
    #[error("can't open the class name file '{path}'")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "the number of classes ({expected}) does not match the number of \
         lines in the class name file ({found})"
    )]
    CountMismatch { expected: usize, found: usize },
}

/// Class names indexed by label id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    /// Parse the contents of a class-name file, expecting exactly
    /// `class_num` non-trivial lines.
    pub fn parse(text: &str, class_num: usize) -> Result<Self, ClassNamesError> {
        let names: Vec<String> = text
            .lines()
            .filter(|line| line.len() > MIN_NAME_LEN)
            .map(str::to_string)
            .collect();

        if names.len() != class_num {
            return Err(ClassNamesError::CountMismatch {
                expected: class_num,
                found:    names.len(),
            });
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of the class with the given label id
    pub fn name(&self, label: usize) -> Option<&str> {
        self.names.get(label).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
