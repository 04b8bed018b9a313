use chrono::NaiveDate;
use clap::Subcommand;
use studyquest_core::{Database, StreakTracker};
use uuid::Uuid;

use crate::common;

#[derive(Subcommand)]
pub enum StreakAction {
    /// Record today's activity and report the streak transition
    Record {
        profile: Uuid,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Clear today's pending streak notice
    Ack {
        profile: Uuid,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Arm a streak freeze from inventory
    ArmFreeze { profile: Uuid },
}

pub fn run(action: StreakAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let tracker = StreakTracker::new(&db);

    match action {
        StreakAction::Record { profile, today } => {
            let evaluation = tracker.evaluate(profile, common::today_source(today).as_ref())?;
            println!("{}", serde_json::to_string_pretty(&evaluation)?);
        }
        StreakAction::Ack { profile, today } => {
            tracker.acknowledge(profile, common::today_source(today).as_ref())?;
        }
        StreakAction::ArmFreeze { profile } => {
            tracker.arm_streak_freeze(profile)?;
            println!("streak freeze armed");
        }
    }
    Ok(())
}
