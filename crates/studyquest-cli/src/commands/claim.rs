use studyquest_core::{ClaimCoordinator, Config, Database};
use uuid::Uuid;

pub fn run(claimable: Uuid, actor: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let claims = ClaimCoordinator::with_config(&db, config.rewards);

    let receipt = claims.claim(claimable, actor)?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}
