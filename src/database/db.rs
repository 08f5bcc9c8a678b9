use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{
    Coaching, DbCoaching, DbUser, NewCoaching, NewTeam, NewTeamMember, NewUser, Team,
    TeamMember, User,
};
use crate::validation::ValidateExt;

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

/// Turns constraint violations into validation errors; anything else stays a
/// database error.
fn map_constraint_error(err: sqlx::Error, context: &str) -> AppError {
    let code = err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code.into_owned());

    match code.as_deref() {
        Some(FOREIGN_KEY_VIOLATION) => {
            AppError::Validation(format!("{}: referenced record does not exist", context))
        }
        Some(UNIQUE_VIOLATION) => AppError::Validation(format!("{}: already exists", context)),
        _ => AppError::Database(err),
    }
}

#[instrument(skip_all, fields(username = %new_user.username, role = %new_user.role))]
pub async fn create_user(pool: &PgPool, new_user: &NewUser) -> Result<i32, AppError> {
    info!("Creating new user");
    new_user.validate_app()?;

    let existing = find_user_by_username(pool, &new_user.username).await?;
    if existing.is_some() {
        return Err(AppError::Validation(format!(
            "Username '{}' already exists",
            new_user.username
        )));
    }

    let password_hash = bcrypt::hash(&new_user.password, bcrypt::DEFAULT_COST)?;

    let id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (username, password_hash, role, team_id)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(&new_user.username)
    .bind(&password_hash)
    .bind(new_user.role.as_str())
    .bind(new_user.team_id)
    .fetch_one(pool)
    .await
    .map_err(|e| map_constraint_error(e, "Username"))?;

    Ok(id)
}

#[instrument(skip(pool))]
pub async fn get_user(pool: &PgPool, id: i32) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, role, team_id, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => User::try_from(user),
        None => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn find_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, AppError> {
    info!("Getting user by username");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, role, team_id, created_at FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    row.map(User::try_from).transpose()
}

#[instrument(skip(pool, password))]
pub async fn authenticate_user(
    pool: &PgPool,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");

    #[derive(sqlx::FromRow)]
    struct Credentials {
        id: i32,
        password_hash: String,
    }

    let credentials = sqlx::query_as::<_, Credentials>(
        "SELECT id, password_hash FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    let Some(credentials) = credentials else {
        return Ok(None);
    };

    match bcrypt::verify(password, &credentials.password_hash) {
        Ok(true) => get_user(pool, credentials.id).await.map(Some),
        Ok(false) | Err(_) => Ok(None),
    }
}

#[instrument(skip(pool))]
pub async fn create_team(pool: &PgPool, new_team: &NewTeam) -> Result<i32, AppError> {
    info!("Creating team");
    new_team.validate_app()?;

    sqlx::query_scalar::<_, i32>("INSERT INTO teams (name, leader_id) VALUES ($1, $2) RETURNING id")
        .bind(&new_team.name)
        .bind(new_team.leader_id)
        .fetch_one(pool)
        .await
        .map_err(|e| map_constraint_error(e, "Team leader"))
}

#[instrument(skip(pool))]
pub async fn get_team(pool: &PgPool, id: i32) -> Result<Team, AppError> {
    info!("Fetching team");
    sqlx::query_as::<_, Team>("SELECT id, name, leader_id FROM teams WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Team with id {} not found in database", id)))
}

#[instrument(skip(pool))]
pub async fn add_team_member(pool: &PgPool, new_member: &NewTeamMember) -> Result<i32, AppError> {
    info!("Adding team member");
    new_member.validate_app()?;

    sqlx::query_scalar::<_, i32>(
        "INSERT INTO team_members (name, team_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(&new_member.name)
    .bind(new_member.team_id)
    .fetch_one(pool)
    .await
    .map_err(|e| map_constraint_error(e, "Team"))
}

#[instrument(skip(pool))]
pub async fn get_team_members(pool: &PgPool, team_id: i32) -> Result<Vec<TeamMember>, AppError> {
    info!("Getting team members");
    let members = sqlx::query_as::<_, TeamMember>(
        "SELECT id, name, team_id FROM team_members WHERE team_id = $1 ORDER BY name, id",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

#[instrument(skip_all, fields(team_id = ?coaching.team_id, coached_by = ?coaching.coached_by))]
pub async fn record_coaching(pool: &PgPool, coaching: &NewCoaching) -> Result<i32, AppError> {
    info!("Recording coaching");
    coaching.validate_app()?;

    sqlx::query_scalar::<_, i32>(
        "INSERT INTO coachings
            (team_id, team_member_name, coaching_style, tcap_id, time_spent, checkmarks,
             performance_rating, total_score, notes, project_notes, coached_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING id",
    )
    .bind(coaching.team_id)
    .bind(&coaching.team_member_name)
    .bind(&coaching.coaching_style)
    .bind(&coaching.tcap_id)
    .bind(coaching.time_spent)
    .bind(Json(&coaching.checkmarks))
    .bind(coaching.performance_rating)
    .bind(coaching.total_score)
    .bind(&coaching.notes)
    .bind(&coaching.project_notes)
    .bind(coaching.coached_by)
    .fetch_one(pool)
    .await
    .map_err(|e| map_constraint_error(e, "Coaching team or coach"))
}

const COACHING_COLUMNS: &str = "id, team_id, team_member_name, coaching_style, tcap_id, \
     time_spent, checkmarks, performance_rating, total_score, notes, project_notes, \
     coached_by, created_at";

#[instrument(skip(pool))]
pub async fn get_coaching(pool: &PgPool, id: i32) -> Result<Coaching, AppError> {
    info!("Getting coaching");
    let query = format!("SELECT {} FROM coachings WHERE id = $1", COACHING_COLUMNS);

    sqlx::query_as::<_, DbCoaching>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Coaching::from)
        .ok_or_else(|| AppError::NotFound(format!("Coaching with id {} not found in database", id)))
}

#[instrument(skip(pool))]
pub async fn get_coachings_for_team(
    pool: &PgPool,
    team_id: i32,
) -> Result<Vec<Coaching>, AppError> {
    info!("Getting coachings for team");
    let query = format!(
        "SELECT {} FROM coachings WHERE team_id = $1 ORDER BY created_at DESC, id DESC",
        COACHING_COLUMNS
    );

    let rows = sqlx::query_as::<_, DbCoaching>(&query)
        .bind(team_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Coaching::from).collect())
}
