pub mod models;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use log::info;
use uuid::Uuid;

use std::env;

use chrono::Utc;

use self::models::{LoginType, NewAuditLog, NewNotification, NotificationKind, PricingRule, User};

use crate::entitlement::pricing::{list_price, FareClass};
use crate::errors::ServiceError;
use crate::schema::{audit_logs, notifications, pricing_rules, system_settings, users};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn open_pool() -> DbPool {
    let default_postgres_host = String::from("localhost");
    let default_postgres_port = String::from("5432");
    let default_postgres_pw = String::from("default_pw");

    let postgres_host = env::var("POSTGRES_HOST").unwrap_or(default_postgres_host);
    let postgres_url = format!(
        "postgres://buspass:{}@{}:{}/buspass",
        env::var("POSTGRES_PASSWORD").unwrap_or(default_postgres_pw),
        &postgres_host,
        env::var("POSTGRES_PORT").unwrap_or(default_postgres_port)
    );

    info!("Connecting to postgres database on {}", &postgres_host);
    let manager = ConnectionManager::<PgConnection>::new(postgres_url);
    Pool::builder()
        .build(manager)
        .expect("cannot open postgres connection pool")
}

pub fn fetch_user(conn: &mut PgConnection, id: Uuid) -> Result<User, ServiceError> {
    users::table
        .find(id)
        .first::<User>(conn)
        .optional()?
        .ok_or(ServiceError::NotFound("user"))
}

/// Loads the acting user and rejects the request unless their login type is
/// one of `allowed`.
pub fn require_role(
    conn: &mut PgConnection,
    id: Uuid,
    allowed: &[LoginType],
) -> Result<User, ServiceError> {
    let user = fetch_user(conn, id)?;
    let role = LoginType::parse(&user.login_type).ok_or(ServiceError::Internal)?;
    if allowed.contains(&role) {
        Ok(user)
    } else {
        Err(ServiceError::Forbidden)
    }
}

pub fn append_audit(
    conn: &mut PgConnection,
    actor: Option<Uuid>,
    action: &str,
    subject: String,
    outcome: String,
) -> Result<(), ServiceError> {
    diesel::insert_into(audit_logs::table)
        .values(NewAuditLog {
            actor,
            action: action.to_string(),
            subject,
            outcome,
            created_at: Utc::now().naive_utc(),
        })
        .execute(conn)?;
    Ok(())
}

pub fn push_notification(
    conn: &mut PgConnection,
    user_id: Uuid,
    title: &str,
    message: String,
    kind: NotificationKind,
) -> Result<(), ServiceError> {
    diesel::insert_into(notifications::table)
        .values(NewNotification {
            user_id: Some(user_id),
            broadcast_role: None,
            title: title.to_string(),
            message,
            kind: kind.as_str().to_string(),
            is_read: false,
            created_at: Utc::now().naive_utc(),
        })
        .execute(conn)?;
    Ok(())
}

/// Price a fare is sold at. An admin rule for the exact role wins, then a
/// role independent rule, then the built in fare table.
pub fn quoted_price(
    conn: &mut PgConnection,
    fare: FareClass,
    role: LoginType,
) -> Result<i32, ServiceError> {
    let rules: Vec<PricingRule> = pricing_rules::table
        .filter(pricing_rules::ticket_type.eq(fare.as_str()))
        .load(conn)?;

    if let Some(rule) = rules
        .iter()
        .find(|rule| rule.role_type.as_deref() == Some(role.as_str()))
    {
        return Ok(rule.price);
    }
    if let Some(rule) = rules.iter().find(|rule| rule.role_type.is_none()) {
        return Ok(rule.price);
    }
    Ok(list_price(fare, role))
}

/// Reads a configuration value, preferring the admin editable settings table
/// over the process environment.
pub fn setting_or_env(
    conn: &mut PgConnection,
    key: &str,
    env_key: &str,
    default: &str,
) -> Result<String, ServiceError> {
    let stored = system_settings::table
        .find(key)
        .select(system_settings::value)
        .first::<String>(conn)
        .optional()?;

    Ok(stored.unwrap_or_else(|| env::var(env_key).unwrap_or_else(|_| default.to_string())))
}
