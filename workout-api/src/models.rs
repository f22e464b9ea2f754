//! Domain models, request payloads and the error type for the workout API.
//! - Entities mirror one row of their table (`exercises`, `users`, `workout`)
//! - Payload types are read out of the JSON body field by field, so a missing, null or
//!   mistyped field becomes a validation message instead of a deserialization failure
//! - `AppError` maps every failure to an HTTP response

use std::{collections::BTreeMap, fmt};

use axum::{extract::rejection::JsonRejection, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Placeholder written over the password of every outbound user.
pub const PASSWORD_MASK: &str = "********";

/// A catalogued exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub muscle: String,
    pub equipment: String,
    pub difficulty: String,
    pub instructions: String,
}

/// Client-supplied exercise fields. Any `id` in the body is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseFields {
    pub name: String,
    pub kind: String,
    pub muscle: String,
    pub equipment: String,
    pub difficulty: String,
    pub instructions: String,
}

impl ExerciseFields {
    pub fn from_body(body: &Value) -> Result<Self, AppError> {
        let mut r = FieldReader::new(body)?;
        let fields = Self {
            name: r.required_text("name"),
            kind: r.required_text("type"),
            muscle: r.required_text("muscle"),
            equipment: r.required_text("equipment"),
            difficulty: r.required_text("difficulty"),
            instructions: r.required_text("instructions"),
        };
        r.finish()?;
        Ok(fields)
    }

    pub fn into_exercise(self, id: i64) -> Exercise {
        Exercise {
            id,
            name: self.name,
            kind: self.kind,
            muscle: self.muscle,
            equipment: self.equipment,
            difficulty: self.difficulty,
            instructions: self.instructions,
        }
    }
}

/// Stored user account. Never serialized directly; see [`UserResponse`].
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &PASSWORD_MASK)
            .finish()
    }
}

/// A user that has not been assigned an id yet.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl CreateUserRequest {
    pub fn from_body(body: &Value) -> Result<Self, AppError> {
        let mut r = FieldReader::new(body)?;
        let req = Self {
            name: r.required_text("name"),
            email: r.required_email("email"),
            password: r.required_text("password"),
        };
        r.finish()?;
        Ok(req)
    }
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        Self { name: req.name, email: req.email, password: req.password }
    }
}

/// Body of `PUT /api/users/{id}`. A blank or absent password keeps the stored one.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn from_body(body: &Value) -> Result<Self, AppError> {
        let mut r = FieldReader::new(body)?;
        let req = Self {
            name: r.required_text("name"),
            email: r.required_email("email"),
            password: r.optional_text("password"),
        };
        r.finish()?;
        Ok(req)
    }

    /// Overwrites name and email; the password only when a non-blank one was sent.
    pub fn apply_to(self, user: &mut User) {
        user.name = self.name;
        user.email = self.email;
        if let Some(password) = self.password.filter(|p| !p.trim().is_empty()) {
            user.password = password;
        }
    }
}

/// Outbound user with the password masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self { id: u.id, name: u.name, email: u.email, password: PASSWORD_MASK.to_string() }
    }
}

/// Case-insensitive email comparison used by every user store.
pub fn emails_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// One exercise slot of a user's workout plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: i64,
    pub user_id: String,
    pub workout_plan_name: String,
    pub exercise_name: String,
    pub day: String,
    pub sets: i32,
    pub reps: i32,
}

/// Body of `POST /api/workout/add-exercise`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkoutFields {
    pub user_id: String,
    pub workout_plan_name: String,
    pub exercise_name: String,
    pub day: String,
    pub sets: i32,
    pub reps: i32,
}

impl WorkoutFields {
    pub fn from_body(body: &Value) -> Result<Self, AppError> {
        let mut r = FieldReader::new(body)?;
        let fields = Self {
            user_id: r.required_id("userId"),
            workout_plan_name: r.required_text("workoutPlanName"),
            exercise_name: r.required_text("exerciseName"),
            day: r.required_text("day"),
            sets: r.count("sets"),
            reps: r.count("reps"),
        };
        r.finish()?;
        Ok(fields)
    }

    pub fn into_workout(self, id: i64) -> Workout {
        Workout {
            id,
            user_id: self.user_id,
            workout_plan_name: self.workout_plan_name,
            exercise_name: self.exercise_name,
            day: self.day,
            sets: self.sets,
            reps: self.reps,
        }
    }
}

/// Projection returned by the per-day listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub name: String,
    pub sets: i32,
    pub reps: i32,
}

impl From<Workout> for WorkoutExercise {
    fn from(w: Workout) -> Self {
        Self { name: w.exercise_name, sets: w.sets, reps: w.reps }
    }
}

/// Result of an upsert keyed by (user, plan, exercise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(Workout),
    Updated(Workout),
}

impl UpsertOutcome {
    pub fn into_inner(self) -> Workout {
        match self {
            UpsertOutcome::Inserted(w) | UpsertOutcome::Updated(w) => w,
        }
    }
}

/// Loose structural email check: one `@`, a dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Reads typed fields out of a JSON object body, collecting one message per bad field.
/// Unknown keys are ignored.
pub struct FieldReader<'a> {
    body: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    pub fn new(body: &'a Value) -> Result<Self, AppError> {
        match body {
            Value::Object(map) => Ok(Self { body: map, errors: FieldErrors::default() }),
            _ => {
                let mut errors = FieldErrors::default();
                errors.add("body", "must be a JSON object");
                Err(AppError::Validation(errors))
            }
        }
    }

    // Missing and null both read as absent.
    fn present(&self, field: &str) -> Option<&'a Value> {
        self.body.get(field).filter(|v| !v.is_null())
    }

    pub fn optional_text(&mut self, field: &'static str) -> Option<String> {
        match self.present(field)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.errors.add(field, "must be a string");
                None
            }
        }
    }

    pub fn required_text(&mut self, field: &'static str) -> String {
        let value = self.optional_text(field).unwrap_or_default();
        self.errors.require(field, &value);
        value
    }

    pub fn required_email(&mut self, field: &'static str) -> String {
        let value = self.optional_text(field).unwrap_or_default();
        self.errors.require_email(field, &value);
        value
    }

    /// Identifier sent either as a string or as an integer; integers keep their decimal form.
    pub fn required_id(&mut self, field: &'static str) -> String {
        let value = match self.present(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
            Some(_) => {
                self.errors.add(field, "must be a string or an integer");
                String::new()
            }
            None => String::new(),
        };
        self.errors.require(field, &value);
        value
    }

    /// Required non-negative integer that fits an `i32`.
    pub fn count(&mut self, field: &'static str) -> i32 {
        let Some(value) = self.present(field) else {
            self.errors.add(field, "must not be blank");
            return 0;
        };
        match value.as_i64() {
            Some(n) if n < 0 => {
                self.errors.add(field, "must not be negative");
                0
            }
            Some(n) => i32::try_from(n).unwrap_or_else(|_| {
                self.errors.add(field, "is too large");
                0
            }),
            None => {
                self.errors.add(field, "must be an integer");
                0
            }
        }
    }

    pub fn finish(self) -> Result<(), AppError> {
        self.errors.into_result()
    }
}

/// Per-field validation messages, keyed by the JSON field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    /// Records a message; the first message for a field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn require(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "must not be blank");
        }
    }

    pub fn require_email(&mut self, field: &'static str, value: &str) {
        self.require(field, value);
        if !is_valid_email(value) {
            self.add(field, "must be a valid email");
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() { Ok(()) } else { Err(AppError::Validation(self)) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// Application-wide error type with variants mapped to HTTP status codes.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("repository error: {0}")]
    Repo(String),
}

impl AppError {
    pub fn user_not_found() -> Self {
        AppError::NotFound("User not found".into())
    }

    pub fn email_taken() -> Self {
        AppError::Conflict("Email already in use".into())
    }

    pub fn workout_not_found(id: i64) -> Self {
        AppError::NotFound(format!("Workout not found: {}", id))
    }

    pub fn workout_slot_taken() -> Self {
        AppError::Conflict("Exercise already scheduled for that day".into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Config(_) | AppError::Repo(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AppError::NotFound(message) | AppError::Conflict(message) => {
                tracing::debug!(%status, %message, "request rejected");
                (status, message).into_response()
            }
            AppError::Validation(fields) => {
                let body = serde_json::json!({ "error": "validation failed", "fields": fields });
                (status, Json(body)).into_response()
            }
            other => {
                tracing::error!(error = %other, "request failed");
                (status, Json(serde_json::json!({ "error": other.to_string() }))).into_response()
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let mut errors = FieldErrors::default();
        errors.add("body", rejection.body_text());
        AppError::Validation(errors)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self { AppError::Repo(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bench_press() -> Value {
        json!({
            "name": "bench press",
            "type": "strength",
            "muscle": "chest",
            "equipment": "barbell",
            "difficulty": "intermediate",
            "instructions": "lie on a bench with feet flat"
        })
    }

    fn validation_errors(result: Result<impl fmt::Debug, AppError>) -> FieldErrors {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn email_validation_works() {
        assert!(is_valid_email("kass@example.com"));
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("kass@example"));
        assert!(!is_valid_email("kass@@example.com"));
        assert!(!is_valid_email("ka ss@example.com"));
    }

    #[test]
    fn emails_match_folds_unicode_case() {
        assert!(emails_match("Kass@Example.com", "kass@example.COM"));
        assert!(emails_match("ÉLODIE@example.com", "élodie@example.com"));
        assert!(!emails_match("kass@example.com", "kas@example.com"));
    }

    #[test]
    fn exercise_fields_report_every_blank_field() {
        assert!(ExerciseFields::from_body(&bench_press()).is_ok());

        let mut body = bench_press();
        body["name"] = json!("  ");
        body.as_object_mut().unwrap().remove("muscle");
        let errors = validation_errors(ExerciseFields::from_body(&body));
        assert_eq!(errors.get("name"), Some("must not be blank"));
        assert_eq!(errors.get("muscle"), Some("must not be blank"));
        assert_eq!(errors.get("type"), None);
    }

    #[test]
    fn null_and_mistyped_fields_become_field_messages() {
        let mut body = bench_press();
        body["name"] = Value::Null;
        body["difficulty"] = json!(3);
        let errors = validation_errors(ExerciseFields::from_body(&body));
        assert_eq!(errors.get("name"), Some("must not be blank"));
        assert_eq!(errors.get("difficulty"), Some("must be a string"));

        let errors = validation_errors(ExerciseFields::from_body(&json!([1, 2])));
        assert_eq!(errors.get("body"), Some("must be a JSON object"));
    }

    #[test]
    fn exercise_body_ignores_client_id() {
        let mut body = bench_press();
        body["id"] = json!(99);
        let exercise = ExerciseFields::from_body(&body).unwrap().into_exercise(7);
        assert_eq!(exercise.id, 7);
        assert_eq!(exercise.kind, "strength");
        let json = serde_json::to_value(&exercise).unwrap();
        assert_eq!(json["type"], "strength");
    }

    #[test]
    fn user_response_masks_password() {
        let user = User { id: 1, name: "Kass".into(), email: "kass@example.com".into(), password: "pw".into() };
        assert!(!format!("{:?}", user).contains("\"pw\""));
        let resp = UserResponse::from(user);
        assert_eq!(resp.password, PASSWORD_MASK);
    }

    #[test]
    fn update_keeps_password_when_blank_or_absent() {
        let mut user = User { id: 1, name: "Kass".into(), email: "kass@example.com".into(), password: "old".into() };
        let blank = UpdateUserRequest::from_body(&json!({ "name": "K", "email": "k@example.com", "password": "   " })).unwrap();
        blank.apply_to(&mut user);
        assert_eq!(user.password, "old");
        assert_eq!(user.name, "K");

        let absent = UpdateUserRequest::from_body(&json!({ "name": "K", "email": "k@example.com", "password": null })).unwrap();
        absent.apply_to(&mut user);
        assert_eq!(user.password, "old");

        let fresh = UpdateUserRequest::from_body(&json!({ "name": "K", "email": "k@example.com", "password": "new" })).unwrap();
        fresh.apply_to(&mut user);
        assert_eq!(user.password, "new");
    }

    #[test]
    fn create_user_rejects_malformed_or_null_email() {
        let errors = validation_errors(CreateUserRequest::from_body(&json!({ "name": "Kass", "email": "nope", "password": "pw" })));
        assert_eq!(errors.get("email"), Some("must be a valid email"));

        let errors = validation_errors(CreateUserRequest::from_body(&json!({ "name": "Kass", "email": null, "password": "pw" })));
        assert_eq!(errors.get("email"), Some("must not be blank"));
    }

    #[test]
    fn workout_fields_accept_numeric_user_id() {
        let body = json!({ "userId": 2, "workoutPlanName": "Plan A", "exerciseName": "Pushup", "day": "Mon", "sets": 3, "reps": 12 });
        let fields = WorkoutFields::from_body(&body).unwrap();
        assert_eq!(fields.user_id, "2");
        assert_eq!((fields.sets, fields.reps), (3, 12));
    }

    #[test]
    fn workout_fields_reject_bad_counts_and_missing_keys() {
        let errors = validation_errors(WorkoutFields::from_body(&json!({ "userId": "u1", "sets": -1, "reps": 5 })));
        assert_eq!(errors.get("sets"), Some("must not be negative"));
        assert_eq!(errors.get("workoutPlanName"), Some("must not be blank"));
        assert_eq!(errors.get("reps"), None);

        let errors = validation_errors(WorkoutFields::from_body(&json!({ "userId": true, "sets": "three", "reps": 1.5 })));
        assert_eq!(errors.get("userId"), Some("must be a string or an integer"));
        assert_eq!(errors.get("sets"), Some("must be an integer"));
        assert_eq!(errors.get("reps"), Some("must be an integer"));

        let errors = validation_errors(WorkoutFields::from_body(&json!({ "sets": 3_000_000_000i64 })));
        assert_eq!(errors.get("sets"), Some("is too large"));
        assert_eq!(errors.get("reps"), Some("must not be blank"));
    }

    #[test]
    fn error_statuses() {
        assert_eq!(AppError::workout_not_found(42).to_string(), "Workout not found: 42");
        assert_eq!(AppError::workout_not_found(42).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::email_taken().status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Repo("boom".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
