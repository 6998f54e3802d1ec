//! Challenges: list and join.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::path_segment;
use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub goal: u32,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub joined: bool,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

impl Challenge {
    /// Progress towards the goal, capped at 100.
    pub fn completion_percent(&self) -> u8 {
        if self.goal == 0 {
            return 100;
        }
        let percent = u64::from(self.progress) * 100 / u64::from(self.goal);
        percent.min(100) as u8
    }

    pub fn is_over(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|end| end <= now)
    }
}

pub struct ChallengeService {
    client: Arc<ApiClient>,
}

impl ChallengeService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns the pipeline failure.
    pub async fn list(&self) -> ApiResult<Vec<Challenge>> {
        self.client.send_json(ApiRequest::get("/challenges")).await
    }

    /// Joins a challenge and returns its updated state.
    ///
    /// # Errors
    /// `Validation` for a malformed id, otherwise the pipeline failure.
    pub async fn join(&self, challenge_id: &str) -> ApiResult<Challenge> {
        let id = path_segment("challengeId", challenge_id)?;
        self.client
            .send_json(ApiRequest::post(format!("/challenges/{id}/join")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn challenge(goal: u32, progress: u32) -> Challenge {
        Challenge {
            id: "c1".into(),
            title: "30 day streak".into(),
            description: String::new(),
            goal,
            progress,
            joined: true,
            ends_at: Some(Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_completion_percent_is_capped() {
        assert_eq!(challenge(30, 15).completion_percent(), 50);
        assert_eq!(challenge(30, 45).completion_percent(), 100);
        assert_eq!(challenge(0, 0).completion_percent(), 100);
    }

    #[test]
    fn test_is_over() {
        let c = challenge(10, 1);
        assert!(!c.is_over(Utc.with_ymd_and_hms(2026, 10, 14, 0, 0, 0).unwrap()));
        assert!(c.is_over(Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap()));
    }
}
