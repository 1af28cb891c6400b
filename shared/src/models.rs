//! Data models for the Fitness Coach application
//!
//! Every model tolerates missing optional fields so that payloads produced by
//! the backend, the mock dataset and the AI assistant all deserialize into the
//! same types.

use crate::ids::EntityId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Demo user that owns every entity
pub const DEMO_USER_ID: i64 = 1;

/// An entity the client can cache, queue and replay
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> Option<EntityId>;

    fn set_id(&mut self, id: Option<EntityId>);

    fn updated_at(&self) -> Option<DateTime<Utc>>;

    /// Stamp `created_at` if absent and always refresh `updated_at`
    fn touch(&mut self, now: DateTime<Utc>);
}

macro_rules! impl_entity {
    ($ty:ty) => {
        impl Entity for $ty {
            fn id(&self) -> Option<EntityId> {
                self.id
            }

            fn set_id(&mut self, id: Option<EntityId>) {
                self.id = id;
            }

            fn updated_at(&self) -> Option<DateTime<Utc>> {
                self.updated_at
            }

            fn touch(&mut self, now: DateTime<Utc>) {
                if self.created_at.is_none() {
                    self.created_at = Some(now);
                }
                self.updated_at = Some(now);
            }
        }
    };
}

/// Adherence status of a session or meal on a given day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    NotCompleted,
}

/// One day's adherence to a session or meal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRecord {
    pub date: NaiveDate,
    /// Free text; both "Monday" and "Lunes" appear in real data
    #[serde(default)]
    pub day_of_week: String,
    pub status: CompletionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ============================================================================
// Workouts
// ============================================================================

/// Training plan made of weekly sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_entity!(WorkoutPlan);

/// A single training day within a plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub day_of_week: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub exercises: Vec<ExerciseInstance>,
    #[serde(default)]
    pub completions: Vec<CompletionRecord>,
}

/// A catalog exercise as prescribed inside a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    /// Absent for interval work, which uses `duration_seconds`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Difficulty levels used by the exercise catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "principiante" => Ok(Difficulty::Beginner),
            "intermediate" | "intermedio" => Ok(Difficulty::Intermediate),
            "advanced" | "avanzado" => Ok(Difficulty::Advanced),
            other => Err(format!("Unknown difficulty level: {}", other)),
        }
    }
}

/// Exercise catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muscle_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    /// Not enforced by the backend, see [`Exercise::difficulty_level`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl Exercise {
    pub fn difficulty_level(&self) -> Option<Difficulty> {
        self.difficulty.as_deref().and_then(|d| d.parse().ok())
    }
}

// ============================================================================
// Nutrition
// ============================================================================

/// Daily nutrition plan with macro targets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_grams: Option<f64>,
    #[serde(default)]
    pub meals: Vec<Meal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_entity!(NutritionPlan);

/// A meal within a nutrition plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    /// Scheduled time, e.g. "08:30"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_grams: Option<f64>,
    #[serde(default)]
    pub foods: Vec<Food>,
    #[serde(default)]
    pub completions: Vec<CompletionRecord>,
}

/// A food item within a meal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Food {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
}

// ============================================================================
// Progress
// ============================================================================

/// Body measurements in centimetres
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BodyMeasurements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chest: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waist: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hips: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biceps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thighs: Option<f64>,
}

/// A dated body-weight and composition entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    pub date: NaiveDate,
    /// Required; kept optional so a missing value reaches validation
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_fat_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<BodyMeasurements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_entity!(ProgressEntry);

impl ProgressEntry {
    /// New entry for the demo user
    pub fn new(date: NaiveDate, weight: f64) -> Self {
        Self {
            id: None,
            user_id: DEMO_USER_ID,
            date,
            weight: Some(weight),
            body_fat_percentage: None,
            measurements: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// User account as returned by the auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Token and user returned by a successful login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

fn default_user_id() -> i64 {
    DEMO_USER_ID
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_workout_plan_accepts_minimal_payload() {
        let plan: WorkoutPlan = serde_json::from_value(json!({ "name": "Fuerza" })).unwrap();
        assert_eq!(plan.user_id, DEMO_USER_ID);
        assert!(plan.id.is_none());
        assert!(plan.sessions.is_empty());
        assert!(!plan.ai_generated);
    }

    #[test]
    fn test_interval_exercise_has_no_reps() {
        let instance: ExerciseInstance = serde_json::from_value(json!({
            "exercise_id": 4,
            "sets": 3,
            "duration_seconds": 40,
            "rest_seconds": 20
        }))
        .unwrap();
        assert_eq!(instance.reps, None);
        assert_eq!(instance.duration_seconds, Some(40));
    }

    #[test]
    fn test_completion_status_wire_names() {
        let record: CompletionRecord = serde_json::from_value(json!({
            "date": "2025-04-01",
            "day_of_week": "Lunes",
            "status": "not_completed"
        }))
        .unwrap();
        assert_eq!(record.status, CompletionStatus::NotCompleted);
    }

    #[test]
    fn test_touch_keeps_created_at() {
        let mut entry = ProgressEntry::new(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), 75.0);
        let first = Utc::now();
        entry.touch(first);
        let later = first + chrono::Duration::seconds(5);
        entry.touch(later);
        assert_eq!(entry.created_at, Some(first));
        assert_eq!(entry.updated_at, Some(later));
    }

    #[test]
    fn test_difficulty_is_lenient() {
        let exercise = Exercise {
            id: 1,
            name: "Sentadilla".to_string(),
            description: None,
            muscle_group: Some("legs".to_string()),
            equipment: None,
            difficulty: Some("Intermedio".to_string()),
        };
        assert_eq!(exercise.difficulty_level(), Some(Difficulty::Intermediate));

        let odd = Exercise {
            difficulty: Some("expert".to_string()),
            ..exercise
        };
        assert_eq!(odd.difficulty_level(), None);
    }
}
