use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::Serialize;

use crate::database::models::Notification;
use crate::database::{self, DbPool};
use crate::errors::ServiceError;
use crate::routes::Identity;
use crate::schema::notifications;

#[derive(Serialize)]
struct NotificationListEnvelope {
    success: bool,
    notifications: Vec<Notification>,
}

#[derive(Serialize)]
struct NotificationEnvelope {
    success: bool,
    notification: Notification,
}

// GET /api/notifications/list
//
// Direct messages for the caller plus broadcasts aimed at their role.
pub async fn list_notifications(
    pool: web::Data<DbPool>,
    ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let rows = web::block(move || -> Result<Vec<Notification>, ServiceError> {
        let mut conn = pool.get()?;
        let user = database::fetch_user(&mut conn, ident.user_id)?;

        notifications::table
            .filter(
                notifications::user_id
                    .eq(Some(ident.user_id))
                    .or(notifications::broadcast_role.eq(Some(user.login_type))),
            )
            .order(notifications::created_at.desc())
            .load(&mut conn)
            .map_err(Into::into)
    })
    .await??;

    Ok(HttpResponse::Ok().json(NotificationListEnvelope {
        success: true,
        notifications: rows,
    }))
}

// PATCH /api/notifications/{id}/read
//
// Only the owner can mark their notification, broadcasts stay unread.
pub async fn mark_read(
    pool: web::Data<DbPool>,
    ident: Identity,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let notification_id = path.into_inner();

    let notification = web::block(move || -> Result<Notification, ServiceError> {
        let mut conn = pool.get()?;
        diesel::update(
            notifications::table
                .filter(notifications::id.eq(notification_id))
                .filter(notifications::user_id.eq(Some(ident.user_id))),
        )
        .set(notifications::is_read.eq(true))
        .get_result(&mut conn)
        .optional()?
        .ok_or(ServiceError::NotFound("notification"))
    })
    .await??;

    Ok(HttpResponse::Ok().json(NotificationEnvelope {
        success: true,
        notification,
    }))
}
