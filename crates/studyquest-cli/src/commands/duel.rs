use clap::Subcommand;
use studyquest_core::{Config, Database, DuelCoordinator, ProgressionError};
use uuid::Uuid;

use crate::common;

#[derive(Subcommand)]
pub enum DuelAction {
    /// Challenge another player
    Create {
        challenger: Uuid,
        opponent: Uuid,
        #[arg(long)]
        quiz: Uuid,
    },
    /// Submit a score for a challenge
    Score {
        challenge: Uuid,
        #[arg(long)]
        actor: Uuid,
        score: i64,
    },
    /// Show a challenge
    Show { id: Uuid },
}

pub fn run(action: DuelAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let notifier = common::notifier(&config);
    let duels = DuelCoordinator::new(&db, notifier.as_ref());

    match action {
        DuelAction::Create {
            challenger,
            opponent,
            quiz,
        } => match duels.create_challenge(challenger, opponent, quiz) {
            Ok(challenge) => println!("{}", serde_json::to_string_pretty(&challenge)?),
            // A retried create is not a failure: report the pending duel.
            Err(ProgressionError::DuplicateChallenge { existing }) => {
                eprintln!("challenge already pending");
                println!("{}", serde_json::to_string_pretty(&existing)?);
            }
            Err(e) => return Err(e.into()),
        },
        DuelAction::Score {
            challenge,
            actor,
            score,
        } => {
            let updated = duels.submit_score(challenge, actor, score)?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        DuelAction::Show { id } => {
            let challenge = db
                .get_challenge(id)?
                .ok_or_else(|| format!("no challenge {id}"))?;
            println!("{}", serde_json::to_string_pretty(&challenge)?);
        }
    }
    Ok(())
}
