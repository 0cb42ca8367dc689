pub mod commands;
pub mod config;
pub mod error;

use poise::serenity_prelude::GatewayIntents;
use serenity::client::Client;
use tracing::{debug, error, info};

use crate::commands::lottery::manager::LotteryManager;
use crate::commands::lottery::storage::LotteryStore;
use crate::commands::UserData;
use crate::config::Config;
use crate::error::Error;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().expect("Invalid bot configuration");
    debug!("Lottery data path: {}", config.data_path.display());

    let store = LotteryStore::new(&config.data_path);
    let manager = LotteryManager::new(store, config.superusers.clone());
    let framework = poise::Framework::<UserData, Error>::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::lottery::lottery(), commands::help::help()],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("{} is connected!", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let rescheduled = manager.reschedule_pending(ctx.http.clone())?;
                info!("Rescheduled {} pending draws.", rescheduled);

                Ok(UserData { manager })
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&config.token, intents)
        .framework(framework)
        .await
        .expect("Cannot create a Discord client");

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }
}
