use futures::future::join_all;
use puzzle_sessions::game::{GameId, PlayerId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

// --- Re-definitions of DTOs ---
// The server's snapshot types are serialize-only, so the client keeps its own view.

#[derive(Debug, Deserialize)]
struct GameSummary {
    id: GameId,
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateGameRequest {
    name: String,
    owner_id: Option<PlayerId>,
    owner_name: String,
}

#[derive(Debug, Serialize)]
struct AddPlayerRequest {
    player_id: PlayerId,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
enum ClientUpdate {
    BeginGame,
    PuzzleCompleted { player_id: PlayerId },
}

#[derive(Debug, Deserialize)]
struct StateView {
    kind: String,
    ordinal: u64,
    #[serde(default)]
    current_puzzle: Option<usize>,
}

const BASE_URL: &str = "http://127.0.0.1:3000";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Polls the game state like a real client, reporting a solve on every puzzle it
/// sees. Whoever lands first gets the point.
async fn play(
    client: reqwest::Client,
    game_id: GameId,
    player_id: PlayerId,
    name: String,
    solve_delay: Duration,
) -> Result<(), reqwest::Error> {
    let state_url = format!("{}/games/{}/state", BASE_URL, game_id);
    let mut last_ordinal = None;

    loop {
        let state: StateView = client.get(&state_url).send().await?.json().await?;

        if last_ordinal != Some(state.ordinal) {
            println!("....[{name}] state #{} {}", state.ordinal, state.kind);
            last_ordinal = Some(state.ordinal);

            match state.kind.as_str() {
                "SolvingPuzzle" => {
                    tokio::time::sleep(solve_delay).await;
                    println!("....[{name}] solved puzzle {:?}", state.current_puzzle);
                    client
                        .post(&state_url)
                        .json(&ClientUpdate::PuzzleCompleted { player_id })
                        .send()
                        .await?;
                }
                "RoundEnded" | "Abandoned" => return Ok(()),
                _ => {}
            }
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host_id = PlayerId::new();
    let guest_id = PlayerId::new();
    let client = reqwest::Client::new();

    println!("--- PUZZLE SESSION TEST CLIENT ---");
    println!("Host ID:  {}", host_id);
    println!("Guest ID: {}", guest_id);

    println!("\n[1] Creating Game...");
    let game = client
        .post(format!("{}/games", BASE_URL))
        .json(&CreateGameRequest {
            name: "Test client game".to_string(),
            owner_id: Some(host_id),
            owner_name: "Host".to_string(),
        })
        .send()
        .await?
        .json::<GameSummary>()
        .await?;
    println!("Success! Game {} ({})", game.id, game.name);

    println!("\n[2] Guest Joining...");
    client
        .post(format!("{}/games/{}/players", BASE_URL, game.id))
        .json(&AddPlayerRequest {
            player_id: guest_id,
            name: "Guest".to_string(),
        })
        .send()
        .await?
        .error_for_status()?;
    println!("Success! Guest joined.");

    println!("\n[3] Beginning round...");
    client
        .post(format!("{}/games/{}/state", BASE_URL, game.id))
        .json(&ClientUpdate::BeginGame)
        .send()
        .await?
        .error_for_status()?;

    let results = join_all([
        play(client.clone(), game.id, host_id, "Host".to_string(), Duration::from_millis(400)),
        play(client.clone(), game.id, guest_id, "Guest".to_string(), Duration::from_millis(700)),
    ])
    .await;
    for result in results {
        result?;
    }

    let score: Value = client
        .get(format!("{}/games/{}/score", BASE_URL, game.id))
        .send()
        .await?
        .json()
        .await?;
    println!("\n[4] Final score: {}", serde_json::to_string_pretty(&score)?);

    Ok(())
}
