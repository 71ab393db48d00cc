use actix_web::{web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::database::models::{LoginType, Pass, Profile, Ticket, PASS_ACTIVE, TICKET_PAID};
use crate::database::{self, DbPool};
use crate::entitlement::{self, Verification};
use crate::errors::ServiceError;
use crate::routes::Identity;
use crate::schema::{passes, profiles, tickets};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    qr_id: String,
    route_id: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateEnvelope {
    success: bool,
    qr_id: String,
    qr_code: String,
    profile: Profile,
}

// POST /api/qr/verify
//
// Scanner endpoint. Always answers 200 with a verification payload, an
// unknown qr id is a regular `valid: false` result so the conductor UI
// never trips over a scan.
pub async fn verify(
    pool: web::Data<DbPool>,
    ident: Identity,
    body: web::Json<VerifyRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = body.into_inner();

    let result = web::block(move || -> Result<Verification, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(
            &mut conn,
            ident.user_id,
            &[LoginType::Conductor, LoginType::Manager, LoginType::Admin],
        )?;
        let now = Utc::now().naive_utc();

        let profile: Option<Profile> = profiles::table
            .filter(profiles::qr_id.eq(&body.qr_id))
            .first(&mut conn)
            .optional()?;

        let (rider_passes, rider_tickets) = match &profile {
            Some(profile) => {
                let rider_passes: Vec<Pass> = passes::table
                    .filter(passes::user_id.eq(profile.user_id))
                    .filter(passes::status.eq(PASS_ACTIVE))
                    .load(&mut conn)?;
                let rider_tickets: Vec<Ticket> = tickets::table
                    .filter(tickets::user_id.eq(profile.user_id))
                    .filter(tickets::payment_status.eq(TICKET_PAID))
                    .load(&mut conn)?;
                (rider_passes, rider_tickets)
            }
            None => (Vec::new(), Vec::new()),
        };

        let result = entitlement::resolve(
            profile.as_ref(),
            &rider_passes,
            &rider_tickets,
            body.route_id,
            now,
        );
        debug!("scan of {} resolved to {}", &body.qr_id, result.outcome());

        // every scan attempt lands in the audit trail, valid or not
        database::append_audit(
            &mut conn,
            Some(ident.user_id),
            "qr.verify",
            match body.route_id {
                Some(route_id) => format!("qr:{} route:{}", body.qr_id, route_id),
                None => format!("qr:{}", body.qr_id),
            },
            result.outcome().to_string(),
        )?;

        Ok(result)
    })
    .await??;

    Ok(HttpResponse::Ok().json(result))
}

// GET /api/qr/generate
//
// Returns the payload the rider's QR code encodes. Rendering the actual
// image is the frontend's business.
pub async fn generate(
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

    Ok(HttpResponse::Ok().json(GenerateEnvelope {
        success: true,
        qr_id: profile.qr_id.clone(),
        qr_code: profile.qr_id.clone(),
        profile,
    }))
}
