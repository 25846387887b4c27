use tracing::{debug, info};

use crate::{
    access::{check_user, Operation},
    error::ApiError,
    groups::user_write_context,
    repo::{Page, Repository},
    users::{
        dto::UserWrite,
        model::{NewUser, User},
    },
    validation::{Violations, ALREADY_USED, NOT_BLANK},
};

pub const PHONE_MAX: usize = 50;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Email and username checks shared by create and update. `except` is the
/// id of the record being edited.
async fn validate_identity(
    repo: &dyn Repository,
    v: &mut Violations,
    email: &str,
    username: &str,
    except: Option<i64>,
) -> Result<(), ApiError> {
    if v.not_blank("email", Some(email)) {
        v.email("email", Some(email));
        if repo.email_taken(email, except).await? {
            v.add("email", ALREADY_USED);
        }
    }
    if v.not_blank("username", Some(username)) && repo.username_taken(username, except).await? {
        v.add("username", ALREADY_USED);
    }
    Ok(())
}

pub async fn find_user(repo: &dyn Repository, id: i64) -> Result<User, ApiError> {
    repo.find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))
}

pub async fn read_user(repo: &dyn Repository, caller: Option<&User>, id: i64) -> Result<User, ApiError> {
    check_user(Operation::Read, caller, None)?;
    find_user(repo, id).await
}

pub async fn list_users(repo: &dyn Repository, caller: Option<&User>, page: Page) -> Result<(Vec<User>, i64), ApiError> {
    check_user(Operation::List, caller, None)?;
    Ok(repo.list_users(page).await?)
}

pub async fn register(repo: &dyn Repository, caller: Option<&User>, payload: UserWrite) -> Result<User, ApiError> {
    check_user(Operation::Create, caller, None)?;
    let payload = payload.restrict(&user_write_context(caller));

    let email = normalize_email(payload.email.as_deref().unwrap_or(""));
    let username = payload.username.unwrap_or_default();

    let mut v = Violations::new();
    validate_identity(repo, &mut v, &email, &username, None).await?;
    match &payload.password {
        Some(p) if !p.is_blank() => {}
        _ => v.add("password", NOT_BLANK),
    }
    v.length("phoneNumber", payload.phone_number.as_deref(), 0, PHONE_MAX, None);

    let (Some(password), true) = (payload.password, v.is_empty()) else {
        return Err(v.into());
    };

    let user = repo
        .insert_user(NewUser {
            email,
            username,
            password_hash: password.into_hash()?,
            phone_number: payload.phone_number,
            roles: payload.roles.unwrap_or_default(),
        })
        .await?;
    info!(user_id = user.id, "user registered");
    Ok(user)
}

/// Partial update of the caller's own account. A new password is rehashed.
pub async fn update_user(
    repo: &dyn Repository,
    caller: Option<&User>,
    id: i64,
    payload: UserWrite,
) -> Result<User, ApiError> {
    let mut user = find_user(repo, id).await?;
    check_user(Operation::Update, caller, Some(&user))?;
    let payload = payload.restrict(&user_write_context(caller));

    let email = payload
        .email
        .as_deref()
        .map(normalize_email)
        .unwrap_or_else(|| user.email.clone());
    let username = payload.username.unwrap_or_else(|| user.username.clone());

    let mut v = Violations::new();
    validate_identity(repo, &mut v, &email, &username, Some(user.id)).await?;
    if payload.password.as_ref().is_some_and(|p| p.is_blank()) {
        v.add("password", NOT_BLANK);
    }
    v.length("phoneNumber", payload.phone_number.as_deref(), 0, PHONE_MAX, None);
    v.into_result()?;

    user.email = email;
    user.username = username;
    if let Some(password) = payload.password {
        user.password_hash = password.into_hash()?;
        debug!(user_id = user.id, "password changed");
    }
    if payload.phone_number.is_some() {
        user.phone_number = payload.phone_number;
    }
    if let Some(roles) = payload.roles {
        user.stored_roles = roles;
    }

    let user = repo.update_user(&user).await?;
    debug!(user_id = user.id, "user updated");
    Ok(user)
}

pub async fn delete_user(repo: &dyn Repository, caller: Option<&User>, id: i64) -> Result<(), ApiError> {
    check_user(Operation::Delete, caller, None)?;
    if !repo.delete_user(id).await? {
        return Err(ApiError::not_found("User", id));
    }
    info!(user_id = id, "user deleted");
    Ok(())
}
