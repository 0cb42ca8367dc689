use poise::Context as PoiseContext;

use crate::commands::UserData;

// Generic context available across Poise commands
pub type Context<'a> = PoiseContext<'a, UserData, crate::error::Error>;
