use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::commands::lottery::models::Lottery;
use crate::error::Result;

// The whole persisted state: scene id (as a string) to the list of
// lotteries running in that scene.
pub type LotteryBook = HashMap<String, Vec<Lottery>>;

// Flat-file JSON storage. Every operation reads the entire book and
// rewrites it in full, with no locking between writers.
#[derive(Clone, Debug)]
pub struct LotteryStore {
    path: PathBuf,
}

impl LotteryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        LotteryStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<LotteryBook> {
        if !self.path.exists() {
            return Ok(LotteryBook::new());
        }

        let raw = fs::read_to_string(&self.path)?;
        // A freshly created data file is empty rather than `{}`.
        if raw.trim().is_empty() {
            return Ok(LotteryBook::new());
        }

        let book = serde_json::from_str(&raw)?;
        Ok(book)
    }

    pub fn save(&self, book: &LotteryBook) -> Result<()> {
        let raw = serde_json::to_string_pretty(book)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}
