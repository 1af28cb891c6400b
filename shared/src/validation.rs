//! Input validation functions
//!
//! Checks run before anything is submitted, cached or queued. Field checks
//! return `Result<(), String>` like the rest of the workspace; the entity
//! validators collect them into [`ValidationError`]s.

use crate::errors::ValidationError;
use crate::models::{CompletionRecord, Meal, NutritionPlan, ProgressEntry, Session, WorkoutPlan};
use once_cell::sync::Lazy;
use regex::Regex;

static MEAL_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]?\d|2[0-3]):[0-5]\d(:[0-5]\d)?$").expect("valid regex"));

/// Validate body weight (kg)
pub fn validate_weight(weight_kg: f64) -> Result<(), String> {
    if weight_kg.is_nan() || weight_kg.is_infinite() {
        return Err("Weight must be a valid number".to_string());
    }
    if weight_kg < 20.0 {
        return Err("Weight must be at least 20 kg".to_string());
    }
    if weight_kg > 500.0 {
        return Err("Weight must be at most 500 kg".to_string());
    }
    Ok(())
}

/// Validate percentage value (0-100)
pub fn validate_percentage(value: f64) -> Result<(), String> {
    if value.is_nan() || value.is_infinite() {
        return Err("Percentage must be a valid number".to_string());
    }
    if !(0.0..=100.0).contains(&value) {
        return Err("Percentage must be between 0 and 100".to_string());
    }
    Ok(())
}

/// Validate a macro or calorie target
pub fn validate_non_negative(value: f64) -> Result<(), String> {
    if value.is_nan() || value.is_infinite() {
        return Err("Value must be a valid number".to_string());
    }
    if value < 0.0 {
        return Err("Value cannot be negative".to_string());
    }
    Ok(())
}

/// Validate a plan or meal name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if name.len() > 255 {
        return Err("Name too long".to_string());
    }
    Ok(())
}

/// Validate a session duration in minutes
pub fn validate_duration_minutes(minutes: u32) -> Result<(), String> {
    if minutes > 1440 {
        return Err("Duration cannot exceed 24 hours".to_string());
    }
    Ok(())
}

/// Validate a scheduled meal time such as "08:30"
pub fn validate_meal_time(time: &str) -> Result<(), String> {
    if !MEAL_TIME.is_match(time.trim()) {
        return Err("Time must look like HH:MM".to_string());
    }
    Ok(())
}

fn check(errors: &mut Vec<ValidationError>, field: &str, result: Result<(), String>) {
    if let Err(message) = result {
        errors.push(ValidationError::new(field, message));
    }
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a progress entry before it is logged
pub fn validate_progress_entry(entry: &ProgressEntry) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    match entry.weight {
        Some(weight) => check(&mut errors, "weight", validate_weight(weight)),
        None => errors.push(ValidationError::new("weight", "Weight is required")),
    }
    if let Some(bf) = entry.body_fat_percentage {
        check(&mut errors, "body_fat_percentage", validate_percentage(bf));
    }
    if let Some(m) = &entry.measurements {
        for (field, value) in [
            ("measurements.chest", m.chest),
            ("measurements.waist", m.waist),
            ("measurements.hips", m.hips),
            ("measurements.biceps", m.biceps),
            ("measurements.thighs", m.thighs),
        ] {
            if let Some(v) = value {
                check(&mut errors, field, validate_non_negative(v));
            }
        }
    }
    finish(errors)
}

fn validate_session(index: usize, session: &Session, errors: &mut Vec<ValidationError>) {
    if let Some(minutes) = session.duration_minutes {
        check(
            errors,
            &format!("sessions[{}].duration_minutes", index),
            validate_duration_minutes(minutes),
        );
    }
    for (i, exercise) in session.exercises.iter().enumerate() {
        if exercise.exercise_id.is_none() && exercise.name.as_deref().map_or(true, str::is_empty) {
            errors.push(ValidationError::new(
                format!("sessions[{}].exercises[{}]", index, i),
                "Exercise needs a catalog id or a name",
            ));
        }
    }
}

/// Validate a workout plan before it is created or updated
pub fn validate_workout_plan(plan: &WorkoutPlan) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check(&mut errors, "name", validate_name(&plan.name));
    for (i, session) in plan.sessions.iter().enumerate() {
        validate_session(i, session, &mut errors);
    }
    finish(errors)
}

fn validate_meal(index: usize, meal: &Meal, errors: &mut Vec<ValidationError>) {
    check(errors, &format!("meals[{}].name", index), validate_name(&meal.name));
    if let Some(time) = &meal.time {
        check(errors, &format!("meals[{}].time", index), validate_meal_time(time));
    }
    for (field, value) in [
        ("calories", meal.calories),
        ("protein_grams", meal.protein_grams),
        ("carbs_grams", meal.carbs_grams),
        ("fat_grams", meal.fat_grams),
    ] {
        if let Some(v) = value {
            check(errors, &format!("meals[{}].{}", index, field), validate_non_negative(v));
        }
    }
}

/// Validate a nutrition plan before it is created or updated
pub fn validate_nutrition_plan(plan: &NutritionPlan) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check(&mut errors, "name", validate_name(&plan.name));
    for (field, value) in [
        ("daily_calories", plan.daily_calories),
        ("protein_grams", plan.protein_grams),
        ("carbs_grams", plan.carbs_grams),
        ("fat_grams", plan.fat_grams),
    ] {
        if let Some(v) = value {
            check(&mut errors, field, validate_non_negative(v));
        }
    }
    for (i, meal) in plan.meals.iter().enumerate() {
        validate_meal(i, meal, &mut errors);
    }
    finish(errors)
}

/// Validate a completion record
pub fn validate_completion(record: &CompletionRecord) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    // Either a clock time or a full timestamp
    if let Some(time) = &record.completed_at {
        if chrono::DateTime::parse_from_rfc3339(time.trim()).is_err() {
            check(&mut errors, "completed_at", validate_meal_time(time));
        }
    }
    finish(errors)
}

/// Join validation errors into one user-facing line
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
