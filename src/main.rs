mod database;
mod entitlement;
mod errors;
mod routes;
mod schema;
mod structs;

use actix_web::{web, App, HttpServer};
use actix_web_prom::PrometheusMetricsBuilder;
use clap::Parser;
use log::info;

use structs::Args;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    let log_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter)).init();

    let pool = database::open_pool();

    let prometheus = PrometheusMetricsBuilder::new("buspass")
        .endpoint("/metrics")
        .build()
        .unwrap();

    info!("Listening on: {}:{}", &args.host, args.port);
    HttpServer::new(move || {
        App::new()
            .wrap(prometheus.clone())
            .app_data(web::Data::new(pool.clone()))
            .service(
                web::scope("/api")
                    .route("/users/signup", web::post().to(routes::users::signup))
                    .route("/users/me", web::get().to(routes::users::me))
                    .route("/profile", web::get().to(routes::users::get_profile))
                    .route("/profile", web::patch().to(routes::users::update_profile))
                    .route("/passes/all", web::get().to(routes::passes::all_passes))
                    .route("/passes/create", web::post().to(routes::passes::create_pass))
                    .route("/passes/user", web::get().to(routes::passes::user_pass))
                    .route(
                        "/passes/pending",
                        web::get().to(routes::passes::pending_passes),
                    )
                    .route(
                        "/passes/{id}/approve",
                        web::patch().to(routes::passes::approve_pass),
                    )
                    .route(
                        "/tickets/create",
                        web::post().to(routes::tickets::create_ticket),
                    )
                    .route("/tickets/list", web::get().to(routes::tickets::list_tickets))
                    .route(
                        "/payments/pending",
                        web::get().to(routes::payments::pending_payments),
                    )
                    .route("/payments/upi-qr", web::get().to(routes::payments::upi_qr))
                    .route(
                        "/payments/{id}/verify",
                        web::patch().to(routes::payments::verify_payment),
                    )
                    .route(
                        "/payments/{id}/proof",
                        web::post().to(routes::payments::upload_proof),
                    )
                    .route("/qr/verify", web::post().to(routes::qr::verify))
                    .route("/qr/generate", web::get().to(routes::qr::generate))
                    .route("/routes/list", web::get().to(routes::transit::list_routes))
                    .route(
                        "/routes/create",
                        web::post().to(routes::transit::create_route),
                    )
                    .route("/routes/{id}", web::patch().to(routes::transit::update_route))
                    .route("/buses/list", web::get().to(routes::transit::list_buses))
                    .route("/buses/create", web::post().to(routes::transit::create_bus))
                    .route("/buses/{id}", web::patch().to(routes::transit::update_bus))
                    .route(
                        "/notifications/list",
                        web::get().to(routes::notifications::list_notifications),
                    )
                    .route(
                        "/notifications/{id}/read",
                        web::patch().to(routes::notifications::mark_read),
                    )
                    .route(
                        "/admin/pricing-rules",
                        web::get().to(routes::admin::list_pricing_rules),
                    )
                    .route(
                        "/admin/pricing-rules",
                        web::post().to(routes::admin::create_pricing_rule),
                    )
                    .route(
                        "/admin/pricing-rules/{ticket_type}",
                        web::patch().to(routes::admin::update_pricing_rule),
                    )
                    .route(
                        "/admin/pricing-rules/{ticket_type}",
                        web::delete().to(routes::admin::delete_pricing_rule),
                    )
                    .route(
                        "/admin/system-settings",
                        web::get().to(routes::admin::list_settings),
                    )
                    .route(
                        "/admin/system-settings/{key}",
                        web::patch().to(routes::admin::upsert_setting),
                    )
                    .route(
                        "/admin/audit-logs",
                        web::get().to(routes::admin::list_audit_logs),
                    ),
            )
    })
    .bind((args.host.as_str(), args.port))?
    .run()
    .await
}
