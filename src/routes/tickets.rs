use actix_web::{web, HttpResponse};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::models::{
    LoginType, NewPayment, NewTicket, Payment, Ticket, PAYMENT_PENDING, TICKET_UNPAID,
};
use crate::database::{self, DbPool};
use crate::entitlement::pricing::{ticket_duration, FareClass};
use crate::errors::ServiceError;
use crate::routes::Identity;
use crate::schema::{bus_routes, payments, tickets};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    route_id: i32,
    ticket_type: String,
}

#[derive(Serialize)]
struct TicketCreated {
    success: bool,
    ticket: Ticket,
    payment: Payment,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TicketRow {
    id: i32,
    route_id: i32,
    route_name: String,
    ticket_type: String,
    price: i32,
    payment_status: String,
    purchase_date: NaiveDateTime,
    valid_until: NaiveDateTime,
}

#[derive(Serialize)]
struct TicketListEnvelope {
    success: bool,
    tickets: Vec<TicketRow>,
}

// POST /api/tickets/create
pub async fn create_ticket(
    pool: web::Data<DbPool>,
    ident: Identity,
    body: web::Json<CreateTicketRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = body.into_inner();
    let fare = FareClass::parse(&body.ticket_type).ok_or_else(|| {
        ServiceError::BadRequest(format!("unknown ticket type {}", body.ticket_type))
    })?;
    if fare != FareClass::Daily {
        return Err(ServiceError::BadRequest(String::from(
            "only DAILY tickets can be purchased, use a pass request instead",
        )));
    }

    let (ticket, payment) = web::block(move || -> Result<(Ticket, Payment), ServiceError> {
        let mut conn = pool.get()?;
        let user = database::fetch_user(&mut conn, ident.user_id)?;
        let role = LoginType::parse(&user.login_type).ok_or(ServiceError::Internal)?;
        let now = Utc::now().naive_utc();

        let route_active = bus_routes::table
            .find(body.route_id)
            .select(bus_routes::active)
            .first::<bool>(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound("route"))?;
        if !route_active {
            return Err(ServiceError::BadRequest(String::from(
                "route is not in service",
            )));
        }

        let price = database::quoted_price(&mut conn, fare, role)?;

        conn.transaction::<_, ServiceError, _>(|conn| {
            let ticket: Ticket = diesel::insert_into(tickets::table)
                .values(NewTicket {
                    user_id: ident.user_id,
                    route_id: body.route_id,
                    ticket_type: fare.as_str().to_string(),
                    price,
                    payment_status: TICKET_UNPAID.to_string(),
                    purchase_date: now,
                    valid_until: now + ticket_duration(),
                })
                .get_result(conn)?;

            let payment: Payment = diesel::insert_into(payments::table)
                .values(NewPayment {
                    user_id: ident.user_id,
                    pass_id: None,
                    ticket_id: Some(ticket.id),
                    amount: price,
                    method: String::from("UPI"),
                    reference: None,
                    proof_url: None,
                    status: PAYMENT_PENDING.to_string(),
                    created_at: now,
                })
                .get_result(conn)?;

            Ok((ticket, payment))
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(TicketCreated {
        success: true,
        ticket,
        payment,
    }))
}

// GET /api/tickets/list
pub async fn list_tickets(
    pool: web::Data<DbPool>,
    ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let rows = web::block(move || -> Result<Vec<TicketRow>, ServiceError> {
        let mut conn = pool.get()?;

        let joined: Vec<(Ticket, String)> = tickets::table
            .inner_join(bus_routes::table)
            .filter(tickets::user_id.eq(ident.user_id))
            .order(tickets::purchase_date.desc())
            .select((tickets::all_columns, bus_routes::name))
            .load(&mut conn)?;

        Ok(joined
            .into_iter()
            .map(|(ticket, route_name)| TicketRow {
                id: ticket.id,
                route_id: ticket.route_id,
                route_name,
                ticket_type: ticket.ticket_type,
                price: ticket.price,
                payment_status: ticket.payment_status,
                purchase_date: ticket.purchase_date,
                valid_until: ticket.valid_until,
            })
            .collect())
    })
    .await??;

    Ok(HttpResponse::Ok().json(TicketListEnvelope {
        success: true,
        tickets: rows,
    }))
}
