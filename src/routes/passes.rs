use actix_web::{web, HttpResponse};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{
    LoginType, NewPass, NewPayment, NotificationKind, Pass, PassType, Payment, Profile, User,
    PASS_ACTIVE, PASS_DISABLED, PASS_INACTIVE, PASS_PENDING, PAYMENT_PENDING, PAYMENT_REJECTED,
    PAYMENT_VERIFIED,
};
use crate::database::{self, DbPool};
use crate::entitlement::pricing::FareClass;
use crate::entitlement::{approval_transition, has_open_pass, projected_status};
use crate::errors::ServiceError;
use crate::routes::Identity;
use crate::schema::{passes, payments, profiles, users};

#[derive(Deserialize)]
pub struct CreatePassRequest {
    #[serde(rename = "type")]
    pass_type: String,
}

#[derive(Serialize)]
struct PassCreated {
    success: bool,
    pass: Pass,
    payment: Payment,
}

#[derive(Serialize)]
struct PassEnvelope {
    success: bool,
    pass: Pass,
}

#[derive(Serialize)]
struct UserPassEnvelope {
    success: bool,
    pass: Option<Pass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment: Option<Payment>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PassProfileView {
    full_name: String,
    id_number: String,
}

#[derive(Serialize)]
struct PassUserView {
    id: Uuid,
    username: String,
    profile: PassProfileView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PassRow {
    id: i32,
    pass_code: String,
    #[serde(rename = "type")]
    pass_type: String,
    status: String,
    start_date: Option<NaiveDateTime>,
    end_date: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    user: PassUserView,
    user_name: String,
}

#[derive(Serialize)]
struct PassListEnvelope {
    passes: Vec<PassRow>,
}

#[derive(Serialize)]
struct PendingListEnvelope {
    success: bool,
    passes: Vec<PassRow>,
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    action: String,
    status: Option<String>,
}

fn new_pass_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("PASS-{}", raw[..8].to_uppercase())
}

fn pass_row((pass, (user, profile)): (Pass, (User, Profile)), now: NaiveDateTime) -> PassRow {
    let status = projected_status(&pass, now).to_string();
    PassRow {
        id: pass.id,
        pass_code: pass.pass_code,
        pass_type: pass.pass_type,
        status,
        start_date: pass.start_date,
        end_date: pass.end_date,
        created_at: pass.created_at,
        user_name: profile.full_name.clone(),
        user: PassUserView {
            id: user.id,
            username: user.username,
            profile: PassProfileView {
                full_name: profile.full_name,
                id_number: profile.id_number,
            },
        },
    }
}

// POST /api/passes/create
pub async fn create_pass(
    pool: web::Data<DbPool>,
    ident: Identity,
    body: web::Json<CreatePassRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = body.into_inner();
    let pass_type = PassType::parse(&body.pass_type)
        .ok_or_else(|| ServiceError::BadRequest(format!("unknown pass type {}", body.pass_type)))?;

    let (pass, payment) = web::block(move || -> Result<(Pass, Payment), ServiceError> {
        let mut conn = pool.get()?;
        let now = Utc::now().naive_utc();

        conn.transaction::<_, ServiceError, _>(|conn| {
            // the row lock serialises concurrent requests from the same
            // rider, so the open-pass check below cannot race a second
            // insert
            let user: User = users::table
                .find(ident.user_id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(ServiceError::NotFound("user"))?;
            let role = LoginType::parse(&user.login_type).ok_or(ServiceError::Internal)?;

            // at most one non terminal pass per user
            let open: Vec<Pass> = passes::table
                .filter(passes::user_id.eq(ident.user_id))
                .filter(passes::status.eq_any([PASS_PENDING, PASS_ACTIVE]))
                .load(conn)?;
            if has_open_pass(&open, now) {
                return Err(ServiceError::Conflict(String::from(
                    "a pass is already pending or active for this user",
                )));
            }

            let amount = database::quoted_price(conn, FareClass::from(pass_type), role)?;

            let pass: Pass = diesel::insert_into(passes::table)
                .values(NewPass {
                    pass_code: new_pass_code(),
                    pass_type: pass_type.as_str().to_string(),
                    status: PASS_PENDING.to_string(),
                    start_date: None,
                    end_date: None,
                    created_at: now,
                    user_id: ident.user_id,
                })
                .get_result(conn)?;

            let payment: Payment = diesel::insert_into(payments::table)
                .values(NewPayment {
                    user_id: ident.user_id,
                    pass_id: Some(pass.id),
                    ticket_id: None,
                    amount,
                    method: String::from("UPI"),
                    reference: None,
                    proof_url: None,
                    status: PAYMENT_PENDING.to_string(),
                    created_at: now,
                })
                .get_result(conn)?;

            Ok((pass, payment))
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(PassCreated {
        success: true,
        pass,
        payment,
    }))
}

// GET /api/passes/user
pub async fn user_pass(
    pool: web::Data<DbPool>,
    ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let (pass, payment) = web::block(move || -> Result<(Option<Pass>, Option<Payment>), ServiceError> {
        let mut conn = pool.get()?;
        let now = Utc::now().naive_utc();

        let pass: Option<Pass> = passes::table
            .filter(passes::user_id.eq(ident.user_id))
            .order(passes::created_at.desc())
            .first(&mut conn)
            .optional()?;

        let payment = match &pass {
            Some(pass) => payments::table
                .filter(payments::pass_id.eq(Some(pass.id)))
                .order(payments::created_at.desc())
                .first::<Payment>(&mut conn)
                .optional()?,
            None => None,
        };

        let pass = pass.map(|mut pass| {
            pass.status = projected_status(&pass, now).to_string();
            pass
        });

        Ok((pass, payment))
    })
    .await??;

    Ok(HttpResponse::Ok().json(UserPassEnvelope {
        success: true,
        pass,
        payment,
    }))
}

// GET /api/passes/all
pub async fn all_passes(
    pool: web::Data<DbPool>,
    ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let rows = web::block(move || -> Result<Vec<PassRow>, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(
            &mut conn,
            ident.user_id,
            &[LoginType::Manager, LoginType::Admin],
        )?;
        let now = Utc::now().naive_utc();

        let joined: Vec<(Pass, (User, Profile))> = passes::table
            .inner_join(users::table.inner_join(profiles::table))
            .order(passes::created_at.desc())
            .load(&mut conn)?;

        Ok(joined.into_iter().map(|row| pass_row(row, now)).collect())
    })
    .await??;

    Ok(HttpResponse::Ok().json(PassListEnvelope { passes: rows }))
}

// GET /api/passes/pending
pub async fn pending_passes(
    pool: web::Data<DbPool>,
    ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let rows = web::block(move || -> Result<Vec<PassRow>, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(
            &mut conn,
            ident.user_id,
            &[LoginType::Manager, LoginType::Admin],
        )?;
        let now = Utc::now().naive_utc();

        let joined: Vec<(Pass, (User, Profile))> = passes::table
            .inner_join(users::table.inner_join(profiles::table))
            .filter(passes::status.eq(PASS_PENDING))
            .order(passes::created_at.asc())
            .load(&mut conn)?;

        Ok(joined.into_iter().map(|row| pass_row(row, now)).collect())
    })
    .await??;

    Ok(HttpResponse::Ok().json(PendingListEnvelope {
        success: true,
        passes: rows,
    }))
}

// PATCH /api/passes/{id}/approve
pub async fn approve_pass(
    pool: web::Data<DbPool>,
    ident: Identity,
    path: web::Path<i32>,
    body: web::Json<ApproveRequest>,
) -> Result<HttpResponse, ServiceError> {
    let pass_id = path.into_inner();
    let body = body.into_inner();

    let pass = web::block(move || -> Result<Pass, ServiceError> {
        let mut conn = pool.get()?;
        let actor = database::require_role(
            &mut conn,
            ident.user_id,
            &[LoginType::Manager, LoginType::Admin],
        )?;
        let now = Utc::now().naive_utc();

        let current: Pass = passes::table
            .find(pass_id)
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound("pass"))?;

        // administrative status override, independent of the payment flow
        if let Some(status) = body.status.as_deref() {
            if status != PASS_DISABLED && status != PASS_INACTIVE {
                return Err(ServiceError::BadRequest(format!(
                    "cannot set pass status {} directly",
                    status
                )));
            }
            return conn.transaction::<_, ServiceError, _>(|conn| {
                let pass: Pass = diesel::update(passes::table.find(pass_id))
                    .set(passes::status.eq(status))
                    .get_result(conn)?;
                database::append_audit(
                    conn,
                    Some(actor.id),
                    "pass.status",
                    format!("pass:{}", pass_id),
                    status.to_string(),
                )?;
                Ok(pass)
            });
        }

        let pass_type = PassType::parse(&current.pass_type).ok_or(ServiceError::Internal)?;

        match body.action.as_str() {
            "APPROVE" => {
                let (next_status, start, end) =
                    approval_transition(&current.status, true, pass_type, now).ok_or_else(
                        || ServiceError::Conflict(String::from("pass is not pending")),
                    )?;

                conn.transaction::<_, ServiceError, _>(|conn| {
                    // the PENDING precondition makes a double click a no-op
                    let updated = diesel::update(
                        passes::table
                            .filter(passes::id.eq(pass_id).and(passes::status.eq(PASS_PENDING))),
                    )
                    .set((
                        passes::status.eq(next_status),
                        passes::start_date.eq(start),
                        passes::end_date.eq(end),
                    ))
                    .execute(conn)?;
                    if updated == 0 {
                        return Err(ServiceError::Conflict(String::from("pass is not pending")));
                    }

                    diesel::update(payments::table.filter(
                        payments::pass_id
                            .eq(Some(pass_id))
                            .and(payments::status.eq(PAYMENT_PENDING)),
                    ))
                    .set(payments::status.eq(PAYMENT_VERIFIED))
                    .execute(conn)?;

                    database::push_notification(
                        conn,
                        current.user_id,
                        "Pass approved",
                        format!(
                            "Your {} pass {} is active until {}",
                            current.pass_type,
                            current.pass_code,
                            end.unwrap_or(now).date()
                        ),
                        NotificationKind::Success,
                    )?;
                    database::append_audit(
                        conn,
                        Some(actor.id),
                        "pass.approve",
                        format!("pass:{}", pass_id),
                        String::from("APPROVED"),
                    )?;

                    passes::table
                        .find(pass_id)
                        .first::<Pass>(conn)
                        .map_err(Into::into)
                })
            }
            "REJECT" => {
                let (next_status, _, _) =
                    approval_transition(&current.status, false, pass_type, now).ok_or_else(
                        || ServiceError::Conflict(String::from("pass is not pending")),
                    )?;

                conn.transaction::<_, ServiceError, _>(|conn| {
                    let updated = diesel::update(
                        passes::table
                            .filter(passes::id.eq(pass_id).and(passes::status.eq(PASS_PENDING))),
                    )
                    .set(passes::status.eq(next_status))
                    .execute(conn)?;
                    if updated == 0 {
                        return Err(ServiceError::Conflict(String::from("pass is not pending")));
                    }

                    diesel::update(payments::table.filter(
                        payments::pass_id
                            .eq(Some(pass_id))
                            .and(payments::status.eq(PAYMENT_PENDING)),
                    ))
                    .set(payments::status.eq(PAYMENT_REJECTED))
                    .execute(conn)?;

                    database::push_notification(
                        conn,
                        current.user_id,
                        "Pass rejected",
                        format!(
                            "Your {} pass request was rejected, please check your payment proof",
                            current.pass_type
                        ),
                        NotificationKind::Warning,
                    )?;
                    database::append_audit(
                        conn,
                        Some(actor.id),
                        "pass.approve",
                        format!("pass:{}", pass_id),
                        String::from("REJECTED"),
                    )?;

                    passes::table
                        .find(pass_id)
                        .first::<Pass>(conn)
                        .map_err(Into::into)
                })
            }
            other => Err(ServiceError::BadRequest(format!("unknown action {}", other))),
        }
    })
    .await??;

    Ok(HttpResponse::Ok().json(PassEnvelope {
        success: true,
        pass,
    }))
}
