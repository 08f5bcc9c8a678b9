use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use validator::{Validate, ValidationError};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Leader,
    Coach,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Leader => "leader",
            Role::Coach => "coach",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s {
            "admin" => Ok(Role::Admin),
            "leader" => Ok(Role::Leader),
            "coach" => Ok(Role::Coach),
            _ => Err(AppError::Validation(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub team_id: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub team_id: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(user: DbUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: user.id,
            username: user.username,
            role: Role::from_str(&user.role)?,
            team_id: user.team_id,
            created_at: user.created_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub role: Role,
    pub team_id: Option<i32>,
}

#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
pub struct Team {
    pub id: i32,
    pub name: String,
    pub leader_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTeam {
    #[validate(length(min = 1, max = 50, message = "Team name must be 1-50 characters"))]
    pub name: String,
    pub leader_id: Option<i32>,
}

#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
pub struct TeamMember {
    pub id: i32,
    pub name: String,
    pub team_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTeamMember {
    pub team_id: Option<i32>,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

pub const MAX_CRITERION_LEN: usize = 100;

/// Named coaching criteria and whether each was met.
///
/// Persisted as a JSONB object, e.g. `{"greeting": true, "follow_up": false}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkmarks(pub BTreeMap<String, bool>);

impl Checkmarks {
    pub fn checked(&self) -> usize {
        self.0.values().filter(|checked| **checked).count()
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for Checkmarks {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn validate_checkmarks(checkmarks: &Checkmarks) -> Result<(), ValidationError> {
    if checkmarks.0.is_empty() {
        return Err(ValidationError::new("checkmarks_empty")
            .with_message("At least one checkmark is required".into()));
    }

    let invalid_name = checkmarks
        .0
        .keys()
        .any(|name| name.trim().is_empty() || name.chars().count() > MAX_CRITERION_LEN);

    if invalid_name {
        return Err(ValidationError::new("checkmark_name")
            .with_message("Checkmark names must be 1-100 characters".into()));
    }

    Ok(())
}

/// `total_score` is stored as DECIMAL(3,1).
fn validate_total_score(score: &Decimal) -> Result<(), ValidationError> {
    if score.normalize().scale() > 1 {
        return Err(ValidationError::new("total_score_scale")
            .with_message("Total score allows one decimal place".into()));
    }

    if score.abs() >= Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("total_score_range")
            .with_message("Total score must be below 100".into()));
    }

    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCoaching {
    pub team_id: Option<i32>,
    #[validate(length(min = 1, max = 100, message = "Team member name must be 1-100 characters"))]
    pub team_member_name: String,
    #[validate(length(min = 1, max = 20, message = "Coaching style must be 1-20 characters"))]
    pub coaching_style: String,
    #[validate(length(max = 50, message = "TCAP id must be at most 50 characters"))]
    pub tcap_id: Option<String>,
    #[validate(range(min = 0, message = "Time spent cannot be negative"))]
    pub time_spent: i32,
    #[validate(custom(function = "validate_checkmarks"))]
    pub checkmarks: Checkmarks,
    #[validate(range(min = 0, message = "Performance rating cannot be negative"))]
    pub performance_rating: i32,
    #[validate(custom(function = "validate_total_score"))]
    pub total_score: Decimal,
    pub notes: Option<String>,
    pub project_notes: Option<String>,
    pub coached_by: Option<i32>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Coaching {
    pub id: i32,
    pub team_id: Option<i32>,
    pub team_member_name: String,
    pub coaching_style: String,
    pub tcap_id: Option<String>,
    pub time_spent: i32,
    pub checkmarks: Checkmarks,
    pub performance_rating: i32,
    pub total_score: Decimal,
    pub notes: Option<String>,
    pub project_notes: Option<String>,
    pub coached_by: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(sqlx::FromRow)]
pub struct DbCoaching {
    pub id: i32,
    pub team_id: Option<i32>,
    pub team_member_name: String,
    pub coaching_style: String,
    pub tcap_id: Option<String>,
    pub time_spent: i32,
    pub checkmarks: Json<Checkmarks>,
    pub performance_rating: i32,
    pub total_score: Decimal,
    pub notes: Option<String>,
    pub project_notes: Option<String>,
    pub coached_by: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbCoaching> for Coaching {
    fn from(db: DbCoaching) -> Self {
        Self {
            id: db.id,
            team_id: db.team_id,
            team_member_name: db.team_member_name,
            coaching_style: db.coaching_style,
            tcap_id: db.tcap_id,
            time_spent: db.time_spent,
            checkmarks: db.checkmarks.0,
            performance_rating: db.performance_rating,
            total_score: db.total_score,
            notes: db.notes,
            project_notes: db.project_notes,
            coached_by: db.coached_by,
            created_at: db.created_at,
        }
    }
}
