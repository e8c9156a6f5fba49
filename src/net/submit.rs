//! Fire-and-forget result upload
//!
//! The session hands its final result to a `ResultSubmitter` exactly once.
//! This one spawns the upload onto a tokio runtime and only logs the
//! outcome; gameplay never waits on the network.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::game::result::{ResumeSnapshot, RunResult};
use crate::game::session::ResultSubmitter;
use crate::net::client::{ApiClient, ClientError};
use crate::net::dto::{SaveDto, SaveSnapshotDto, ScoreCreateDto, ScoreDto};

/// Uploads results and save snapshots in the background
#[derive(Debug, Clone)]
pub struct ApiSubmitter {
    client: Arc<ApiClient>,
    handle: Handle,
}

impl ApiSubmitter {
    pub fn new(client: Arc<ApiClient>, handle: Handle) -> Self {
        Self { client, handle }
    }

    /// Use the runtime of the calling context
    pub fn current(client: Arc<ApiClient>) -> Self {
        Self::new(client, Handle::current())
    }

    /// Spawn the score upload and return its handle
    pub fn spawn_score(&self, result: &RunResult) -> JoinHandle<Result<ScoreDto, ClientError>> {
        let dto = ScoreCreateDto::from(result);
        let client = self.client.clone();

        self.handle.spawn(async move {
            let outcome = client.post_score(&dto).await;
            match &outcome {
                Ok(score) => info!(
                    "Score submitted: id={} player='{}' score={}",
                    score.id, score.player_name, score.score
                ),
                Err(e) => warn!("Score submission failed for '{}': {}", dto.player_name, e),
            }
            outcome
        })
    }

    /// Spawn a save snapshot upload ("save and quit")
    pub fn spawn_save(&self, snapshot: &ResumeSnapshot) -> JoinHandle<Result<SaveDto, ClientError>> {
        let dto = SaveSnapshotDto::from(snapshot);
        let client = self.client.clone();

        self.handle.spawn(async move {
            let outcome = client.upsert_save(&dto).await;
            match &outcome {
                Ok(save) => info!(
                    "Save stored for '{}' (phase {})",
                    save.player_name, save.phase_index
                ),
                Err(e) => warn!("Save upload failed for '{}': {}", dto.player_name, e),
            }
            outcome
        })
    }
}

impl ResultSubmitter for ApiSubmitter {
    fn submit(&mut self, result: &RunResult) {
        // Detached; the task logs its own outcome
        drop(self.spawn_score(result));
    }
}
