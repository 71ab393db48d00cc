use actix_web::{web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{
    LoginType, NewProfile, NewUser, Profile, ProfileUpdate, Role, User,
};
use crate::database::{self, DbPool};
use crate::errors::ServiceError;
use crate::routes::Identity;
use crate::schema::{profiles, roles, users};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    username: String,
    email: String,
    password: String,
    role_id: i32,
    full_name: String,
    id_number: String,
    class_or_position: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    guardian_name: Option<String>,
    guardian_phone: Option<String>,
}

#[derive(Serialize)]
struct UserEnvelope {
    success: bool,
    user: User,
    profile: Profile,
}

#[derive(Serialize)]
struct ProfileEnvelope {
    success: bool,
    profile: Profile,
}

// POST /api/users/signup
//
// The login type comes from the roles lookup table and is fixed for the
// lifetime of the account. Profiles get their qr id here, it never changes
// afterwards.
pub async fn signup(
    pool: web::Data<DbPool>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = body.into_inner();
    if body.username.is_empty() || body.email.is_empty() || body.full_name.is_empty() {
        return Err(ServiceError::BadRequest(String::from(
            "username, email and fullName are required",
        )));
    }

    let (user, profile) = web::block(move || -> Result<(User, Profile), ServiceError> {
        let mut conn = pool.get()?;
        let now = Utc::now().naive_utc();

        let role: Role = roles::table
            .find(body.role_id)
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound("role"))?;
        let login_type =
            LoginType::parse(&role.role_type).ok_or(ServiceError::Internal)?;

        conn.transaction::<_, ServiceError, _>(|conn| {
            let user: User = diesel::insert_into(users::table)
                .values(NewUser {
                    id: Uuid::new_v4(),
                    username: body.username.clone(),
                    email: body.email.clone(),
                    password: body.password.clone(),
                    login_type: login_type.as_str().to_string(),
                    created_at: now,
                })
                .get_result(conn)
                .map_err(|err| match err {
                    diesel::result::Error::DatabaseError(
                        DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => ServiceError::Conflict(String::from("username or email already taken")),
                    other => ServiceError::from(other),
                })?;

            let profile: Profile = diesel::insert_into(profiles::table)
                .values(NewProfile {
                    user_id: user.id,
                    full_name: body.full_name.clone(),
                    id_number: body.id_number.clone(),
                    class_or_position: body.class_or_position.clone(),
                    phone: body.phone.clone(),
                    address: body.address.clone(),
                    guardian_name: body.guardian_name.clone(),
                    guardian_phone: body.guardian_phone.clone(),
                    bio: None,
                    photo: None,
                    qr_id: Uuid::new_v4().to_string(),
                    role_type: login_type.as_str().to_string(),
                })
                .get_result(conn)?;

            Ok((user, profile))
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(UserEnvelope {
        success: true,
        user,
        profile,
    }))
}

// GET /api/users/me
pub async fn me(pool: web::Data<DbPool>, ident: Identity) -> Result<HttpResponse, ServiceError> {
    let (user, profile) = web::block(move || -> Result<(User, Profile), ServiceError> {
        let mut conn = pool.get()?;
        let user = database::fetch_user(&mut conn, ident.user_id)?;
        let profile: Profile = profiles::table
            .filter(profiles::user_id.eq(ident.user_id))
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound("profile"))?;
        Ok((user, profile))
    })
    .await??;

    Ok(HttpResponse::Ok().json(UserEnvelope {
        success: true,
        user,
        profile,
    }))
}

// GET /api/profile
pub async fn get_profile(
    pool: web::Data<DbPool>,
    ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let profile = web::block(move || -> Result<Profile, ServiceError> {
        let mut conn = pool.get()?;
        profiles::table
            .filter(profiles::user_id.eq(ident.user_id))
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound("profile"))
    })
    .await??;

    Ok(HttpResponse::Ok().json(ProfileEnvelope {
        success: true,
        profile,
    }))
}

// PATCH /api/profile
//
// Descriptive fields only. The qr id and role type are not reachable from
// here.
pub async fn update_profile(
    pool: web::Data<DbPool>,
    ident: Identity,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, ServiceError> {
    let body = body.into_inner();
    let empty = body.full_name.is_none()
        && body.class_or_position.is_none()
        && body.phone.is_none()
        && body.address.is_none()
        && body.guardian_name.is_none()
        && body.guardian_phone.is_none()
        && body.bio.is_none()
        && body.photo.is_none();
    if empty {
        return Err(ServiceError::BadRequest(String::from("no fields to update")));
    }

    let profile = web::block(move || -> Result<Profile, ServiceError> {
        let mut conn = pool.get()?;
        diesel::update(profiles::table.filter(profiles::user_id.eq(ident.user_id)))
            .set(&body)
            .get_result(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound("profile"))
    })
    .await??;

    Ok(HttpResponse::Ok().json(ProfileEnvelope {
        success: true,
        profile,
    }))
}
