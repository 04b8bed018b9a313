use clap::Subcommand;
use studyquest_core::{Database, PlayerProfile};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Create a new profile
    Create {
        #[arg(long)]
        premium: bool,
    },
    /// Show a profile
    Show { id: Uuid },
}

pub fn run(action: ProfileAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        ProfileAction::Create { premium } => {
            let mut profile = PlayerProfile::new(Uuid::new_v4());
            profile.is_premium = premium;
            db.insert_profile(&profile)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        ProfileAction::Show { id } => {
            let profile = db
                .get_profile(id)?
                .ok_or_else(|| format!("no profile {id}"))?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }
    Ok(())
}
