// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod error;
pub mod log_file;

pub use error::{PersistenceError, Result};
pub use log_file::FileLogStorage;
