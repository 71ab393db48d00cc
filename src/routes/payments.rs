use actix_web::{web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::models::{
    LoginType, NotificationKind, Pass, PassType, Payment, PASS_PENDING,
    PAYMENT_PENDING, PAYMENT_REJECTED, PAYMENT_VERIFIED, TICKET_PAID, TICKET_REJECTED,
    TICKET_UNPAID,
};
use crate::database::{self, DbPool};
use crate::entitlement::approval_transition;
use crate::entitlement::pricing::ticket_duration;
use crate::errors::ServiceError;
use crate::routes::Identity;
use crate::schema::{passes, payments, profiles, tickets, users};

#[derive(Deserialize)]
pub struct VerifyRequest {
    action: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    reference: Option<String>,
    proof_url: Option<String>,
}

#[derive(Serialize)]
struct PaymentEnvelope {
    success: bool,
    payment: Payment,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRow {
    #[serde(flatten)]
    payment: Payment,
    user_name: String,
    user_email: String,
}

#[derive(Serialize)]
struct PaymentListEnvelope {
    success: bool,
    payments: Vec<PaymentRow>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpiDetails {
    upi_id: String,
    merchant_name: String,
}

#[derive(Serialize)]
struct UpiEnvelope {
    success: bool,
    upi: UpiDetails,
}

// PATCH /api/payments/{id}/verify
pub async fn verify_payment(
    pool: web::Data<DbPool>,
    ident: Identity,
    path: web::Path<i32>,
    body: web::Json<VerifyRequest>,
) -> Result<HttpResponse, ServiceError> {
    let payment_id = path.into_inner();
    let body = body.into_inner();

    let approve = match body.action.as_str() {
        "APPROVE" => true,
        "REJECT" => false,
        other => {
            return Err(ServiceError::BadRequest(format!("unknown action {}", other)));
        }
    };

    let payment = web::block(move || -> Result<Payment, ServiceError> {
        let mut conn = pool.get()?;
        let actor = database::require_role(
            &mut conn,
            ident.user_id,
            &[LoginType::Manager, LoginType::Admin],
        )?;
        let now = Utc::now().naive_utc();
        let next_status = if approve {
            PAYMENT_VERIFIED
        } else {
            PAYMENT_REJECTED
        };

        conn.transaction::<_, ServiceError, _>(|conn| {
            // PENDING precondition makes the decision idempotent per payment
            let updated = diesel::update(
                payments::table
                    .filter(payments::id.eq(payment_id).and(payments::status.eq(PAYMENT_PENDING))),
            )
            .set(payments::status.eq(next_status))
            .execute(conn)?;
            if updated == 0 {
                return Err(ServiceError::Conflict(String::from(
                    "payment already processed",
                )));
            }

            let payment: Payment = payments::table.find(payment_id).first(conn)?;

            // cascade to the linked entitlement
            if let Some(pass_id) = payment.pass_id {
                if approve {
                    let pass: Pass = passes::table.find(pass_id).first(conn)?;
                    let pass_type =
                        PassType::parse(&pass.pass_type).ok_or(ServiceError::Internal)?;
                    let (next, start, end) =
                        approval_transition(&pass.status, true, pass_type, now).ok_or_else(
                            || ServiceError::Conflict(String::from("pass is not pending")),
                        )?;
                    // a pass disabled or rejected in the meantime must not
                    // leave the payment verified, zero rows rolls back
                    let updated = diesel::update(
                        passes::table
                            .filter(passes::id.eq(pass_id).and(passes::status.eq(PASS_PENDING))),
                    )
                    .set((
                        passes::status.eq(next),
                        passes::start_date.eq(start),
                        passes::end_date.eq(end),
                    ))
                    .execute(conn)?;
                    if updated == 0 {
                        return Err(ServiceError::Conflict(String::from("pass is not pending")));
                    }
                    database::push_notification(
                        conn,
                        payment.user_id,
                        "Payment verified",
                        format!("Your pass {} is now active", pass.pass_code),
                        NotificationKind::Success,
                    )?;
                } else {
                    // pass stays PENDING so the rider can re-upload proof
                    database::push_notification(
                        conn,
                        payment.user_id,
                        "Payment rejected",
                        String::from("Your payment proof was rejected, please upload it again"),
                        NotificationKind::Warning,
                    )?;
                }
            }

            if let Some(ticket_id) = payment.ticket_id {
                if approve {
                    diesel::update(tickets::table.find(ticket_id))
                        .set((
                            tickets::payment_status.eq(TICKET_PAID),
                            tickets::valid_until.eq(now + ticket_duration()),
                        ))
                        .execute(conn)?;
                    database::push_notification(
                        conn,
                        payment.user_id,
                        "Payment verified",
                        String::from("Your ticket is paid and ready for travel"),
                        NotificationKind::Success,
                    )?;
                } else {
                    diesel::update(tickets::table.find(ticket_id))
                        .set(tickets::payment_status.eq(TICKET_REJECTED))
                        .execute(conn)?;
                    database::push_notification(
                        conn,
                        payment.user_id,
                        "Payment rejected",
                        String::from("Your ticket payment proof was rejected"),
                        NotificationKind::Warning,
                    )?;
                }
            }

            database::append_audit(
                conn,
                Some(actor.id),
                "payment.verify",
                format!("payment:{}", payment_id),
                body.action,
            )?;

            Ok(payment)
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(PaymentEnvelope {
        success: true,
        payment,
    }))
}

// POST /api/payments/{id}/proof
pub async fn upload_proof(
    pool: web::Data<DbPool>,
    ident: Identity,
    path: web::Path<i32>,
    body: web::Json<ProofRequest>,
) -> Result<HttpResponse, ServiceError> {
    let payment_id = path.into_inner();
    let body = body.into_inner();
    if body.reference.is_none() && body.proof_url.is_none() {
        return Err(ServiceError::BadRequest(String::from(
            "reference or proofUrl is required",
        )));
    }

    let payment = web::block(move || -> Result<Payment, ServiceError> {
        let mut conn = pool.get()?;

        let current: Payment = payments::table
            .find(payment_id)
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound("payment"))?;
        if current.user_id != ident.user_id {
            return Err(ServiceError::Forbidden);
        }
        if current.status == PAYMENT_VERIFIED {
            return Err(ServiceError::Conflict(String::from(
                "payment is already verified",
            )));
        }

        conn.transaction::<_, ServiceError, _>(|conn| {
            let payment: Payment = diesel::update(payments::table.find(payment_id))
                .set((
                    payments::reference.eq(body.reference.or(current.reference.clone())),
                    payments::proof_url.eq(body.proof_url.or(current.proof_url.clone())),
                    // a fresh proof puts a rejected payment back in review
                    payments::status.eq(PAYMENT_PENDING),
                ))
                .get_result(conn)?;

            if let Some(ticket_id) = payment.ticket_id {
                diesel::update(
                    tickets::table
                        .filter(tickets::id.eq(ticket_id))
                        .filter(tickets::payment_status.eq(TICKET_REJECTED)),
                )
                .set(tickets::payment_status.eq(TICKET_UNPAID))
                .execute(conn)?;
            }

            Ok(payment)
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(PaymentEnvelope {
        success: true,
        payment,
    }))
}

// GET /api/payments/pending
pub async fn pending_payments(
    pool: web::Data<DbPool>,
    ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let rows = web::block(move || -> Result<Vec<PaymentRow>, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(
            &mut conn,
            ident.user_id,
            &[LoginType::Manager, LoginType::Admin],
        )?;

        let joined: Vec<(Payment, String, String)> = payments::table
            .inner_join(users::table.inner_join(profiles::table))
            .filter(payments::status.eq(PAYMENT_PENDING))
            .order(payments::created_at.asc())
            .select((payments::all_columns, profiles::full_name, users::email))
            .load(&mut conn)?;

        Ok(joined
            .into_iter()
            .map(|(payment, user_name, user_email)| PaymentRow {
                payment,
                user_name,
                user_email,
            })
            .collect())
    })
    .await??;

    Ok(HttpResponse::Ok().json(PaymentListEnvelope {
        success: true,
        payments: rows,
    }))
}

// GET /api/payments/upi-qr
pub async fn upi_qr(pool: web::Data<DbPool>, _ident: Identity) -> Result<HttpResponse, ServiceError> {
    let upi = web::block(move || -> Result<UpiDetails, ServiceError> {
        let mut conn = pool.get()?;
        Ok(UpiDetails {
            upi_id: database::setting_or_env(&mut conn, "upi.id", "UPI_ID", "depot@upi")?,
            merchant_name: database::setting_or_env(
                &mut conn,
                "upi.merchant",
                "UPI_MERCHANT",
                "City Bus Depot",
            )?,
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(UpiEnvelope { success: true, upi }))
}
