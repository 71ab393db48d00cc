use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{
    Bus, BusRoute, BusRouteUpdate, BusUpdate, LoginType, NewBus, NewBusRoute,
};
use crate::database::{self, DbPool};
use crate::errors::ServiceError;
use crate::routes::Identity;
use crate::schema::{bus_routes, buses};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteRequest {
    name: String,
    stops: Vec<String>,
    schedule_times: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusRequest {
    number_plate: String,
    from_stop: String,
    to_stop: String,
    departure: String,
    arrival: String,
    total_seats: i32,
    route_id: Option<i32>,
    conductor_id: Option<Uuid>,
}

#[derive(Serialize)]
struct RouteListEnvelope {
    success: bool,
    routes: Vec<BusRoute>,
}

#[derive(Serialize)]
struct RouteEnvelope {
    success: bool,
    route: BusRoute,
}

#[derive(Serialize)]
struct BusListEnvelope {
    success: bool,
    buses: Vec<Bus>,
}

#[derive(Serialize)]
struct BusEnvelope {
    success: bool,
    bus: Bus,
}

// GET /api/routes/list
pub async fn list_routes(
    pool: web::Data<DbPool>,
    _ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let routes = web::block(move || -> Result<Vec<BusRoute>, ServiceError> {
        let mut conn = pool.get()?;
        bus_routes::table
            .order(bus_routes::name.asc())
            .load(&mut conn)
            .map_err(Into::into)
    })
    .await??;

    Ok(HttpResponse::Ok().json(RouteListEnvelope {
        success: true,
        routes,
    }))
}

// POST /api/routes/create
pub async fn create_route(
    pool: web::Data<DbPool>,
    ident: Identity,
    body: web::Json<CreateRouteRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = body.into_inner();
    if body.name.is_empty() || body.stops.len() < 2 {
        return Err(ServiceError::BadRequest(String::from(
            "a route needs a name and at least two stops",
        )));
    }

    let route = web::block(move || -> Result<BusRoute, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(
            &mut conn,
            ident.user_id,
            &[LoginType::Manager, LoginType::Admin],
        )?;

        diesel::insert_into(bus_routes::table)
            .values(NewBusRoute {
                name: body.name,
                stops: body.stops,
                schedule_times: body.schedule_times,
                active: true,
            })
            .get_result(&mut conn)
            .map_err(Into::into)
    })
    .await??;

    Ok(HttpResponse::Ok().json(RouteEnvelope {
        success: true,
        route,
    }))
}

// PATCH /api/routes/{id}
pub async fn update_route(
    pool: web::Data<DbPool>,
    ident: Identity,
    path: web::Path<i32>,
    body: web::Json<BusRouteUpdate>,
) -> Result<HttpResponse, ServiceError> {
    let route_id = path.into_inner();
    let body = body.into_inner();
    if body.name.is_none()
        && body.stops.is_none()
        && body.schedule_times.is_none()
        && body.active.is_none()
    {
        return Err(ServiceError::BadRequest(String::from("no fields to update")));
    }

    let route = web::block(move || -> Result<BusRoute, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(
            &mut conn,
            ident.user_id,
            &[LoginType::Manager, LoginType::Admin],
        )?;

        diesel::update(bus_routes::table.find(route_id))
            .set(&body)
            .get_result(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound("route"))
    })
    .await??;

    Ok(HttpResponse::Ok().json(RouteEnvelope {
        success: true,
        route,
    }))
}

// GET /api/buses/list
pub async fn list_buses(
    pool: web::Data<DbPool>,
    _ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let fleet = web::block(move || -> Result<Vec<Bus>, ServiceError> {
        let mut conn = pool.get()?;
        buses::table
            .order(buses::number_plate.asc())
            .load(&mut conn)
            .map_err(Into::into)
    })
    .await??;

    Ok(HttpResponse::Ok().json(BusListEnvelope {
        success: true,
        buses: fleet,
    }))
}

// POST /api/buses/create
pub async fn create_bus(
    pool: web::Data<DbPool>,
    ident: Identity,
    body: web::Json<CreateBusRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = body.into_inner();
    if body.number_plate.is_empty() || body.total_seats <= 0 {
        return Err(ServiceError::BadRequest(String::from(
            "a bus needs a number plate and a positive seat count",
        )));
    }

    let bus = web::block(move || -> Result<Bus, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(
            &mut conn,
            ident.user_id,
            &[LoginType::Manager, LoginType::Admin],
        )?;

        if let Some(route_id) = body.route_id {
            let exists = bus_routes::table
                .find(route_id)
                .select(bus_routes::id)
                .first::<i32>(&mut conn)
                .optional()?;
            if exists.is_none() {
                return Err(ServiceError::NotFound("route"));
            }
        }

        diesel::insert_into(buses::table)
            .values(NewBus {
                number_plate: body.number_plate,
                from_stop: body.from_stop,
                to_stop: body.to_stop,
                departure: body.departure,
                arrival: body.arrival,
                total_seats: body.total_seats,
                route_id: body.route_id,
                conductor_id: body.conductor_id,
                active: true,
            })
            .get_result(&mut conn)
            .map_err(Into::into)
    })
    .await??;

    Ok(HttpResponse::Ok().json(BusEnvelope { success: true, bus }))
}

// PATCH /api/buses/{id}
pub async fn update_bus(
    pool: web::Data<DbPool>,
    ident: Identity,
    path: web::Path<i32>,
    body: web::Json<BusUpdate>,
) -> Result<HttpResponse, ServiceError> {
    let bus_id = path.into_inner();
    let body = body.into_inner();
    if body.number_plate.is_none()
        && body.from_stop.is_none()
        && body.to_stop.is_none()
        && body.departure.is_none()
        && body.arrival.is_none()
        && body.total_seats.is_none()
        && body.route_id.is_none()
        && body.conductor_id.is_none()
        && body.active.is_none()
    {
        return Err(ServiceError::BadRequest(String::from("no fields to update")));
    }

    let bus = web::block(move || -> Result<Bus, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(
            &mut conn,
            ident.user_id,
            &[LoginType::Manager, LoginType::Admin],
        )?;

        diesel::update(buses::table.find(bus_id))
            .set(&body)
            .get_result(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound("bus"))
    })
    .await??;

    Ok(HttpResponse::Ok().json(BusEnvelope { success: true, bus }))
}
