//! Activity logging.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ApiRequest};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Run,
    Walk,
    Cycle,
    Swim,
    Strength,
    Yoga,
    Other,
}

impl ActivityKind {
    pub fn all() -> &'static [ActivityKind] {
        &[
            ActivityKind::Run,
            ActivityKind::Walk,
            ActivityKind::Cycle,
            ActivityKind::Swim,
            ActivityKind::Strength,
            ActivityKind::Yoga,
            ActivityKind::Other,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Run => "run",
            ActivityKind::Walk => "walk",
            ActivityKind::Cycle => "cycle",
            ActivityKind::Swim => "swim",
            ActivityKind::Strength => "strength",
            ActivityKind::Yoga => "yoga",
            ActivityKind::Other => "other",
        }
    }

    /// Whether a distance makes sense for this kind.
    pub fn has_distance(&self) -> bool {
        matches!(
            self,
            ActivityKind::Run | ActivityKind::Walk | ActivityKind::Cycle | ActivityKind::Swim
        )
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ActivityKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| {
                let valid: Vec<&str> =
                    ActivityKind::all().iter().map(ActivityKind::as_str).collect();
                format!("unknown activity '{s}' (expected one of: {})", valid.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub kind: ActivityKind,
    pub duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub kind: ActivityKind,
    pub duration_minutes: u32,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub xp_awarded: u32,
    pub logged_at: DateTime<Utc>,
}

pub struct ActivityService {
    client: Arc<ApiClient>,
}

impl ActivityService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Logs an activity; the server assigns the id and awarded XP.
    ///
    /// # Errors
    /// `Validation` for an invalid entry, otherwise the pipeline failure.
    pub async fn log(&self, activity: &NewActivity) -> ApiResult<Activity> {
        validate(activity)?;
        self.client
            .send_json(ApiRequest::post("/activities").body(activity)?)
            .await
    }

    /// # Errors
    /// Returns the pipeline failure.
    pub async fn list(&self) -> ApiResult<Vec<Activity>> {
        self.client.send_json(ApiRequest::get("/activities")).await
    }
}

fn validate(activity: &NewActivity) -> ApiResult<()> {
    if activity.duration_minutes == 0 {
        return Err(ApiError::invalid_field(
            "durationMinutes",
            "Duration must be at least one minute",
        ));
    }
    if let Some(distance) = activity.distance_km {
        if !distance.is_finite() || distance < 0.0 {
            return Err(ApiError::invalid_field("distanceKm", "Distance cannot be negative"));
        }
        if !activity.kind.has_distance() {
            return Err(ApiError::invalid_field(
                "distanceKm",
                format!("{} activities do not track distance", activity.kind),
            ));
        }
    }
    Ok(())
}
