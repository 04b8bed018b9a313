use clap::Subcommand;
use studyquest_core::{pending_badges, Database};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum BadgesAction {
    /// Badges the player newly qualifies for
    Pending { profile: Uuid },
    /// Full badge catalog
    Catalog,
}

pub fn run(action: BadgesAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        BadgesAction::Pending { profile } => {
            let unlockable = pending_badges(&db, profile)?;
            println!("{}", serde_json::to_string_pretty(&unlockable)?);
        }
        BadgesAction::Catalog => {
            let definitions = db.badge_definitions()?;
            println!("{}", serde_json::to_string_pretty(&definitions)?);
        }
    }
    Ok(())
}
