pub mod context;
pub mod help;
pub mod lottery;

pub use crate::commands::context::Context;
use crate::commands::lottery::manager::LotteryManager;

// User data, which is stored and accessible in all command invocations
pub struct UserData {
    pub manager: LotteryManager,
}
