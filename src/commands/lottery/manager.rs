use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Local};
use rand::seq::SliceRandom;
use serenity::http::Http;
use serenity::model::id::ChannelId;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::commands::lottery::models::{
    default_end_time, now_truncated, parse_input_time, Lottery,
};
use crate::commands::lottery::scheduler::DrawScheduler;
use crate::commands::lottery::storage::LotteryStore;
use crate::error::{Error, Result};

// Everything needed to create a new lottery from a command invocation.
#[derive(Clone, Debug)]
pub struct LotteryRequest {
    pub scene: u64,
    pub creator: u64,
    pub bot_id: u64,
    pub keyword: String,
    pub participants_limit: usize,
    // Optional YYYY-MM-DD/HH:MM:SS timestamps. Defaults: now / today 23:59:59.
    pub start: Option<String>,
    pub end: Option<String>,
}

// The result of a finished draw. The winner is `None` when nobody
// joined the lottery before its end time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DrawOutcome {
    pub keyword: String,
    pub winner: Option<u64>,
}

// Cheap to clone: the book path and the job registry are shared between
// all clones, so command handlers and scheduled draw jobs see one state.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct LotteryManager {
    store: LotteryStore,
    scheduler: Arc<DrawScheduler>,
    superusers: Arc<HashSet<u64>>,
}

impl LotteryManager {
    pub fn new(store: LotteryStore, superusers: HashSet<u64>) -> Self {
        LotteryManager {
            store,
            scheduler: Arc::new(DrawScheduler::new()),
            superusers: Arc::new(superusers),
        }
    }

    pub fn create(&self, request: LotteryRequest, http: Arc<Http>) -> Result<Lottery> {
        if request.keyword.trim().is_empty() {
            return Err(Error::Lottery("No keyword provided".to_string()));
        }

        let start_time = match &request.start {
            Some(value) => parse_input_time(value)?,
            None => now_truncated(),
        };
        let end_time = match &request.end {
            Some(value) => parse_input_time(value)?,
            None => default_end_time()?,
        };

        if start_time < now_truncated() {
            return Err(Error::Lottery("Start time must be in the future".to_string()));
        }
        if start_time >= end_time {
            return Err(Error::Lottery("End time must be after start time".to_string()));
        }

        let mut book = self.store.load()?;
        let scene_key = request.scene.to_string();
        let lotteries = book.entry(scene_key).or_default();

        if lotteries.iter().any(|lottery| lottery.keyword == request.keyword) {
            let message = format!(
                "A lottery with the keyword '{}' already exists in this scene.",
                request.keyword,
            );
            return Err(Error::Lottery(message));
        }

        let lottery = Lottery::new(
            request.creator,
            request.scene,
            &request.keyword,
            request.participants_limit,
            start_time,
            end_time,
            request.bot_id,
        );
        lotteries.push(lottery.clone());
        self.store.save(&book)?;

        self.schedule_draw(lottery.id, lottery.scene, end_time, http);
        Ok(lottery)
    }

    pub fn join(&self, scene: u64, user: u64, keyword: &str) -> Result<Lottery> {
        let mut book = self.store.load()?;
        let lotteries = book
            .get_mut(&scene.to_string())
            .ok_or_else(|| Error::Lottery("No lottery found in this scene".to_string()))?;

        let lottery = lotteries
            .iter_mut()
            .find(|lottery| lottery.keyword == keyword)
            .ok_or_else(|| {
                let message = format!("No lotteries found matching the keyword '{}'", keyword);
                Error::Lottery(message)
            })?;

        if lottery.participants.contains(&user) {
            let message = format!("You have already joined the lottery '{}'.", keyword);
            return Err(Error::Lottery(message));
        }
        if lottery.is_full() {
            let message = format!("The lottery '{}' is already full.", keyword);
            return Err(Error::Lottery(message));
        }

        lottery.participants.push(user);
        let updated = lottery.clone();
        self.store.save(&book)?;
        Ok(updated)
    }

    pub fn list(&self, scene: u64) -> Result<Vec<Lottery>> {
        let book = self.store.load()?;
        match book.get(&scene.to_string()) {
            Some(lotteries) if !lotteries.is_empty() => Ok(lotteries.clone()),
            _ => Err(Error::Lottery("No lottery found in this scene".to_string())),
        }
    }

    pub fn delete(&self, scene: u64, user: u64, keyword: &str) -> Result<()> {
        let mut book = self.store.load()?;
        let lotteries = book
            .get_mut(&scene.to_string())
            .ok_or_else(|| Error::Lottery("No lottery found in this scene".to_string()))?;

        let position = lotteries
            .iter()
            .position(|lottery| lottery.keyword == keyword)
            .ok_or_else(|| {
                let message = format!("No lotteries found matching the keyword '{}'", keyword);
                Error::Lottery(message)
            })?;

        if user != lotteries[position].creator && !self.superusers.contains(&user) {
            let message = "You are not authorized to delete this lottery".to_string();
            return Err(Error::Lottery(message));
        }

        let lottery = lotteries.remove(position);
        // A failed removal only means the job already fired or was never
        // scheduled in this process. Log it and move on.
        if let Err(err) = self.scheduler.remove(&lottery.id) {
            error!(
                "Failed to remove the job for lottery {}: {}",
                lottery.keyword, err,
            );
        }

        self.store.save(&book)?;
        Ok(())
    }

    // Removes the lottery from the book and picks the winner uniformly at
    // random among its participants. Invoked by the scheduled draw job.
    pub fn draw(&self, lottery_id: Uuid, scene: u64) -> Result<DrawOutcome> {
        let mut book = self.store.load()?;
        let lotteries = book.get_mut(&scene.to_string()).ok_or_else(|| {
            let message = format!("No lotteries found in scene {}.", scene);
            Error::Lottery(message)
        })?;

        let position = lotteries
            .iter()
            .position(|lottery| lottery.id == lottery_id)
            .ok_or_else(|| {
                let message = format!("No lottery found with the id {}.", lottery_id);
                Error::Lottery(message)
            })?;

        let lottery = lotteries.remove(position);
        self.store.save(&book)?;

        let winner = lottery.participants.choose(&mut rand::thread_rng()).copied();
        Ok(DrawOutcome {
            keyword: lottery.keyword,
            winner,
        })
    }

    // Re-registers a draw job for every persisted lottery. Called once on
    // startup so pending draws survive a bot restart.
    pub fn reschedule_pending(&self, http: Arc<Http>) -> Result<usize> {
        let book = self.store.load()?;
        let mut rescheduled = 0;

        for lotteries in book.values() {
            for lottery in lotteries {
                match lottery.end_time() {
                    Ok(end_time) => {
                        self.schedule_draw(lottery.id, lottery.scene, end_time, http.clone());
                        rescheduled += 1;
                    }
                    Err(err) => {
                        warn!("Can't reschedule lottery {}: {}", lottery.keyword, err);
                    }
                }
            }
        }

        Ok(rescheduled)
    }

    fn schedule_draw(&self, lottery_id: Uuid, scene: u64, fire_at: DateTime<Local>, http: Arc<Http>) {
        let manager = self.clone();
        self.scheduler.schedule(lottery_id, fire_at, async move {
            manager.execute_draw(lottery_id, scene, http).await;
        });
    }

    async fn execute_draw(&self, lottery_id: Uuid, scene: u64, http: Arc<Http>) {
        let outcome = match self.draw(lottery_id, scene) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Draw for lottery {} was skipped: {}", lottery_id, err);
                return;
            }
        };

        let winner = match outcome.winner {
            Some(winner) => winner,
            None => {
                info!("Lottery {} has no participants to draw.", outcome.keyword);
                return;
            }
        };
        info!("Lottery {} has ended. Winner is {}.", outcome.keyword, winner);

        let channel = ChannelId::new(scene);
        let ended = format!("Lottery {} has ended.", outcome.keyword);
        if let Err(err) = channel.say(&http, ended).await {
            error!("Can't send the message to the channel: {}", err);
            return;
        }
        let announcement = format!("Winner is <@{}>.", winner);
        if let Err(err) = channel.say(&http, announcement).await {
            error!("Can't send the message to the channel: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use serenity::http::Http;
    use tempfile::NamedTempFile;

    use crate::commands::lottery::manager::{LotteryManager, LotteryRequest};
    use crate::commands::lottery::storage::LotteryStore;

    const SCENE: u64 = 100;
    const CREATOR: u64 = 1;
    const SUPERUSER: u64 = 999;

    fn get_manager(file: &NamedTempFile) -> LotteryManager {
        let store = LotteryStore::new(file.path());
        LotteryManager::new(store, HashSet::from([SUPERUSER]))
    }

    fn get_http() -> Arc<Http> {
        Arc::new(Http::new(""))
    }

    fn get_request(keyword: &str) -> LotteryRequest {
        LotteryRequest {
            scene: SCENE,
            creator: CREATOR,
            bot_id: 42,
            keyword: keyword.to_string(),
            participants_limit: 3,
            start: Some("2030-01-01/10:00:00".to_string()),
            end: Some("2030-01-01/12:00:00".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_a_new_lottery() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);

        let result = manager.create(get_request("prize"), get_http());
        assert_eq!(result.is_ok(), true);

        let lotteries = manager.list(SCENE).unwrap();
        assert_eq!(lotteries.len(), 1);
        assert_eq!(lotteries[0].keyword, "prize".to_string());
    }

    #[tokio::test]
    async fn test_get_error_for_a_duplicate_keyword_in_the_same_scene() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("prize"), get_http()).unwrap();

        let result = manager.create(get_request("prize"), get_http());
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "A lottery with the keyword 'prize' already exists in this scene.".to_string(),
        );
    }

    #[tokio::test]
    async fn test_create_the_same_keyword_in_another_scene() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("prize"), get_http()).unwrap();

        let mut request = get_request("prize");
        request.scene = SCENE + 1;
        let result = manager.create(request, get_http());
        assert_eq!(result.is_ok(), true);
    }

    #[tokio::test]
    async fn test_get_error_for_an_empty_keyword() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);

        let result = manager.create(get_request("  "), get_http());
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "No keyword provided".to_string(),
        );
    }

    #[tokio::test]
    async fn test_get_error_for_a_start_time_in_the_past() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);

        let mut request = get_request("prize");
        request.start = Some("2020-01-01/10:00:00".to_string());
        let result = manager.create(request, get_http());
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Start time must be in the future".to_string(),
        );
    }

    #[tokio::test]
    async fn test_get_error_for_an_end_time_before_the_start_time() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);

        let mut request = get_request("prize");
        request.end = Some("2030-01-01/09:00:00".to_string());
        let result = manager.create(request, get_http());
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "End time must be after start time".to_string(),
        );
    }

    #[tokio::test]
    async fn test_get_error_for_a_malformed_time() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);

        let mut request = get_request("prize");
        request.end = Some("tomorrow".to_string());
        let result = manager.create(request, get_http());
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Time format error, use YYYY-MM-DD/HH:MM:SS".to_string(),
        );
    }

    #[tokio::test]
    async fn test_join_a_lottery() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("prize"), get_http()).unwrap();

        let result = manager.join(SCENE, 10, "prize");
        assert_eq!(result.is_ok(), true);
        assert_eq!(result.unwrap().participants, vec![10]);
    }

    #[tokio::test]
    async fn test_get_error_for_joining_twice() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("prize"), get_http()).unwrap();
        manager.join(SCENE, 10, "prize").unwrap();

        let result = manager.join(SCENE, 10, "prize");
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "You have already joined the lottery 'prize'.".to_string(),
        );
    }

    #[tokio::test]
    async fn test_get_error_for_joining_a_full_lottery() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        let mut request = get_request("prize");
        request.participants_limit = 1;
        manager.create(request, get_http()).unwrap();
        manager.join(SCENE, 10, "prize").unwrap();

        let result = manager.join(SCENE, 20, "prize");
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "The lottery 'prize' is already full.".to_string(),
        );
    }

    #[tokio::test]
    async fn test_get_error_for_joining_an_unknown_keyword() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("prize"), get_http()).unwrap();

        let result = manager.join(SCENE, 10, "other");
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "No lotteries found matching the keyword 'other'".to_string(),
        );
    }

    #[tokio::test]
    async fn test_get_error_for_joining_in_an_empty_scene() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);

        let result = manager.join(SCENE, 10, "prize");
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "No lottery found in this scene".to_string(),
        );
    }

    #[tokio::test]
    async fn test_list_lotteries_in_the_scene() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("first"), get_http()).unwrap();
        manager.create(get_request("second"), get_http()).unwrap();

        let lotteries = manager.list(SCENE).unwrap();
        assert_eq!(lotteries.len(), 2);
    }

    #[tokio::test]
    async fn test_get_error_for_listing_an_empty_scene() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);

        let result = manager.list(SCENE);
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "No lottery found in this scene".to_string(),
        );
    }

    #[tokio::test]
    async fn test_delete_a_lottery_by_the_creator() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("prize"), get_http()).unwrap();

        let result = manager.delete(SCENE, CREATOR, "prize");
        assert_eq!(result.is_ok(), true);

        let listing = manager.list(SCENE);
        assert_eq!(listing.is_err(), true);
    }

    #[tokio::test]
    async fn test_delete_a_lottery_by_a_superuser() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("prize"), get_http()).unwrap();

        let result = manager.delete(SCENE, SUPERUSER, "prize");
        assert_eq!(result.is_ok(), true);
    }

    #[tokio::test]
    async fn test_get_error_for_an_unauthorized_deletion() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("prize"), get_http()).unwrap();

        let result = manager.delete(SCENE, 10, "prize");
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "You are not authorized to delete this lottery".to_string(),
        );
    }

    #[tokio::test]
    async fn test_get_error_for_deleting_an_unknown_keyword() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("prize"), get_http()).unwrap();

        let result = manager.delete(SCENE, CREATOR, "other");
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "No lotteries found matching the keyword 'other'".to_string(),
        );
    }

    #[tokio::test]
    async fn test_draw_returns_one_of_the_participants() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        let lottery = manager.create(get_request("prize"), get_http()).unwrap();
        manager.join(SCENE, 10, "prize").unwrap();
        manager.join(SCENE, 20, "prize").unwrap();
        manager.join(SCENE, 30, "prize").unwrap();

        let outcome = manager.draw(lottery.id, SCENE).unwrap();
        assert_eq!(outcome.keyword, "prize".to_string());
        assert_eq!(vec![10, 20, 30].contains(&outcome.winner.unwrap()), true);
    }

    #[tokio::test]
    async fn test_draw_removes_the_lottery_from_the_book() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        let lottery = manager.create(get_request("prize"), get_http()).unwrap();
        manager.join(SCENE, 10, "prize").unwrap();

        manager.draw(lottery.id, SCENE).unwrap();
        let listing = manager.list(SCENE);
        assert_eq!(listing.is_err(), true);
    }

    #[tokio::test]
    async fn test_draw_without_participants_has_no_winner() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        let lottery = manager.create(get_request("prize"), get_http()).unwrap();

        let outcome = manager.draw(lottery.id, SCENE).unwrap();
        assert_eq!(outcome.winner, None);
    }

    #[tokio::test]
    async fn test_get_error_for_drawing_an_unknown_lottery() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("prize"), get_http()).unwrap();

        let unknown = uuid::Uuid::new_v4();
        let result = manager.draw(unknown, SCENE);
        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err().to_string(),
            format!("No lottery found with the id {}.", unknown),
        );
    }

    #[tokio::test]
    async fn test_reschedule_pending_draws_from_the_book() {
        let file = NamedTempFile::new().unwrap();
        let manager = get_manager(&file);
        manager.create(get_request("first"), get_http()).unwrap();
        manager.create(get_request("second"), get_http()).unwrap();

        // A fresh manager over the same book, as after a restart.
        let restarted = get_manager(&file);
        let result = restarted.reschedule_pending(get_http());
        assert_eq!(result.is_ok(), true);
        assert_eq!(result.unwrap(), 2);
    }
}
