use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_DATA_PATH: &str = "lottery.json";

#[derive(Clone, Debug)]
pub struct Config {
    pub token: String,
    // Users which are allowed to delete any lottery in any scene.
    pub superusers: HashSet<u64>,
    // A path to the JSON file with all tracked lotteries.
    pub data_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("DISCORD_TOKEN").map_err(|_| {
            Error::Config("Expected a DISCORD_TOKEN in the environment".to_string())
        })?;
        let superusers = parse_superusers(
            &env::var("LOTTERY_SUPERUSERS").unwrap_or_default(),
        )?;
        let data_path = env::var("LOTTERY_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        Ok(Config {
            token,
            superusers,
            data_path,
        })
    }
}

fn parse_superusers(value: &str) -> Result<HashSet<u64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            chunk.parse::<u64>().map_err(|_| {
                let message = format!("Invalid user id in LOTTERY_SUPERUSERS: {}", chunk);
                Error::Config(message)
            })
        })
        .collect()
}
