//! Recoverable, user-facing rejections of a request.
//!
//! Это не ошибки: операция вернула понятное сообщение, хост показывает его пользователю.
//! Настоящие сбои (I/O, битый JSON) идут через anyhow::Error.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserInputError {
    #[error("If file_list is given, analysis_dir should have only one plain text file.")]
    FileListWithManyInputs,

    #[error("Please, check that {} contains correct paths.", .list.display())]
    EmptyFileList { list: PathBuf },

    #[error("No MultiQC data in this directory found: {}", .dir.display())]
    NoData { dir: PathBuf },

    #[error("Please specify only one module (got {count}).")]
    TooManyModules { count: usize },
}

/// Result of an operation that may reject its input.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Rejected(UserInputError),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&UserInputError> {
        match self {
            Outcome::Done(_) => None,
            Outcome::Rejected(e) => Some(e),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Done(v) => Outcome::Done(f(v)),
            Outcome::Rejected(e) => Outcome::Rejected(e),
        }
    }
}

impl<T> From<UserInputError> for Outcome<T> {
    fn from(e: UserInputError) -> Self {
        Outcome::Rejected(e)
    }
}
