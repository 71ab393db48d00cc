use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::models::{
    AuditLog, LoginType, NewPricingRule, PricingRule, SystemSetting,
};
use crate::database::{self, DbPool};
use crate::entitlement::pricing::FareClass;
use crate::errors::ServiceError;
use crate::routes::Identity;
use crate::schema::{audit_logs, pricing_rules, system_settings};

#[derive(Serialize)]
struct RuleListEnvelope {
    success: bool,
    rules: Vec<PricingRule>,
}

#[derive(Serialize)]
struct RuleEnvelope {
    success: bool,
    rule: PricingRule,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdateRequest {
    price: i32,
    role_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleScopeQuery {
    role_type: Option<String>,
}

#[derive(Serialize)]
struct SettingListEnvelope {
    success: bool,
    settings: Vec<SystemSetting>,
}

#[derive(Serialize)]
struct SettingEnvelope {
    success: bool,
    setting: SystemSetting,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingUpdateRequest {
    value: String,
    value_type: Option<String>,
    category: Option<String>,
    description: Option<String>,
}

#[derive(Serialize)]
struct AuditListEnvelope {
    success: bool,
    logs: Vec<AuditLog>,
}

#[derive(Deserialize)]
pub struct AuditQuery {
    limit: Option<i64>,
}

fn validate_setting_value(value: &str, value_type: &str) -> Result<(), ServiceError> {
    let ok = match value_type {
        "boolean" => value.parse::<bool>().is_ok(),
        "number" => value.parse::<f64>().is_ok(),
        "json" => serde_json::from_str::<serde_json::Value>(value).is_ok(),
        "string" => true,
        other => {
            return Err(ServiceError::BadRequest(format!(
                "unknown value type {}",
                other
            )));
        }
    };
    if ok {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(format!(
            "value is not a valid {}",
            value_type
        )))
    }
}

fn validate_rule(ticket_type: &str, role_type: &Option<String>) -> Result<(), ServiceError> {
    if FareClass::parse(ticket_type).is_none() {
        return Err(ServiceError::BadRequest(format!(
            "unknown ticket type {}",
            ticket_type
        )));
    }
    if let Some(role) = role_type {
        if LoginType::parse(role).is_none() {
            return Err(ServiceError::BadRequest(format!("unknown role {}", role)));
        }
    }
    Ok(())
}

// GET /api/admin/pricing-rules
pub async fn list_pricing_rules(
    pool: web::Data<DbPool>,
    ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let rules = web::block(move || -> Result<Vec<PricingRule>, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(&mut conn, ident.user_id, &[LoginType::Admin])?;
        pricing_rules::table
            .order(pricing_rules::ticket_type.asc())
            .load(&mut conn)
            .map_err(Into::into)
    })
    .await??;

    Ok(HttpResponse::Ok().json(RuleListEnvelope {
        success: true,
        rules,
    }))
}

// POST /api/admin/pricing-rules
pub async fn create_pricing_rule(
    pool: web::Data<DbPool>,
    ident: Identity,
    body: web::Json<NewPricingRule>,
) -> Result<HttpResponse, ServiceError> {
    let body = body.into_inner();
    validate_rule(&body.ticket_type, &body.role_type)?;
    if body.price < 0 {
        return Err(ServiceError::BadRequest(String::from(
            "price cannot be negative",
        )));
    }

    let rule = web::block(move || -> Result<PricingRule, ServiceError> {
        let mut conn = pool.get()?;
        let actor = database::require_role(&mut conn, ident.user_id, &[LoginType::Admin])?;

        conn.transaction::<_, ServiceError, _>(|conn| {
            let rule: PricingRule = diesel::insert_into(pricing_rules::table)
                .values(&body)
                .get_result(conn)?;
            database::append_audit(
                conn,
                Some(actor.id),
                "pricing.create",
                format!("rule:{}", rule.id),
                format!("{}={}", rule.ticket_type, rule.price),
            )?;
            Ok(rule)
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(RuleEnvelope {
        success: true,
        rule,
    }))
}

// PATCH /api/admin/pricing-rules/{ticketType}
pub async fn update_pricing_rule(
    pool: web::Data<DbPool>,
    ident: Identity,
    path: web::Path<String>,
    body: web::Json<RuleUpdateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let ticket_type = path.into_inner();
    let body = body.into_inner();
    validate_rule(&ticket_type, &body.role_type)?;

    let rule = web::block(move || -> Result<PricingRule, ServiceError> {
        let mut conn = pool.get()?;
        let actor = database::require_role(&mut conn, ident.user_id, &[LoginType::Admin])?;

        conn.transaction::<_, ServiceError, _>(|conn| {
            let rule: PricingRule = match &body.role_type {
                Some(role) => diesel::update(
                    pricing_rules::table
                        .filter(pricing_rules::ticket_type.eq(&ticket_type))
                        .filter(pricing_rules::role_type.eq(Some(role.clone()))),
                )
                .set(pricing_rules::price.eq(body.price))
                .get_result(conn)
                .optional()?
                .ok_or(ServiceError::NotFound("pricing rule"))?,
                None => diesel::update(
                    pricing_rules::table
                        .filter(pricing_rules::ticket_type.eq(&ticket_type))
                        .filter(pricing_rules::role_type.is_null()),
                )
                .set(pricing_rules::price.eq(body.price))
                .get_result(conn)
                .optional()?
                .ok_or(ServiceError::NotFound("pricing rule"))?,
            };

            database::append_audit(
                conn,
                Some(actor.id),
                "pricing.update",
                format!("rule:{}", rule.id),
                format!("{}={}", rule.ticket_type, rule.price),
            )?;
            Ok(rule)
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(RuleEnvelope {
        success: true,
        rule,
    }))
}

// DELETE /api/admin/pricing-rules/{ticketType}
pub async fn delete_pricing_rule(
    pool: web::Data<DbPool>,
    ident: Identity,
    path: web::Path<String>,
    query: web::Query<RuleScopeQuery>,
) -> Result<HttpResponse, ServiceError> {
    let ticket_type = path.into_inner();
    let query = query.into_inner();

    web::block(move || -> Result<(), ServiceError> {
        let mut conn = pool.get()?;
        let actor = database::require_role(&mut conn, ident.user_id, &[LoginType::Admin])?;

        conn.transaction::<_, ServiceError, _>(|conn| {
            let deleted = match &query.role_type {
                Some(role) => diesel::delete(
                    pricing_rules::table
                        .filter(pricing_rules::ticket_type.eq(&ticket_type))
                        .filter(pricing_rules::role_type.eq(Some(role.clone()))),
                )
                .execute(conn)?,
                None => diesel::delete(
                    pricing_rules::table.filter(pricing_rules::ticket_type.eq(&ticket_type)),
                )
                .execute(conn)?,
            };
            if deleted == 0 {
                return Err(ServiceError::NotFound("pricing rule"));
            }
            database::append_audit(
                conn,
                Some(actor.id),
                "pricing.delete",
                format!("ticket_type:{}", ticket_type),
                format!("{} rules removed", deleted),
            )?;
            Ok(())
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(crate::routes::Response { success: true }))
}

// GET /api/admin/system-settings
pub async fn list_settings(
    pool: web::Data<DbPool>,
    ident: Identity,
) -> Result<HttpResponse, ServiceError> {
    let settings = web::block(move || -> Result<Vec<SystemSetting>, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(&mut conn, ident.user_id, &[LoginType::Admin])?;
        system_settings::table
            .order(system_settings::key.asc())
            .load(&mut conn)
            .map_err(Into::into)
    })
    .await??;

    Ok(HttpResponse::Ok().json(SettingListEnvelope {
        success: true,
        settings,
    }))
}

// PATCH /api/admin/system-settings/{key}
pub async fn upsert_setting(
    pool: web::Data<DbPool>,
    ident: Identity,
    path: web::Path<String>,
    body: web::Json<SettingUpdateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let key = path.into_inner();
    let body = body.into_inner();
    let value_type = body
        .value_type
        .clone()
        .unwrap_or_else(|| String::from("string"));
    validate_setting_value(&body.value, &value_type)?;

    let setting = web::block(move || -> Result<SystemSetting, ServiceError> {
        let mut conn = pool.get()?;
        let actor = database::require_role(&mut conn, ident.user_id, &[LoginType::Admin])?;

        let row = SystemSetting {
            key: key.clone(),
            value: body.value,
            value_type,
            category: body.category.unwrap_or_else(|| String::from("general")),
            description: body.description,
        };

        conn.transaction::<_, ServiceError, _>(|conn| {
            let setting: SystemSetting = diesel::insert_into(system_settings::table)
                .values(&row)
                .on_conflict(system_settings::key)
                .do_update()
                .set((
                    system_settings::value.eq(&row.value),
                    system_settings::value_type.eq(&row.value_type),
                    system_settings::category.eq(&row.category),
                    system_settings::description.eq(&row.description),
                ))
                .get_result(conn)?;

            database::append_audit(
                conn,
                Some(actor.id),
                "settings.update",
                format!("setting:{}", setting.key),
                setting.value.clone(),
            )?;
            Ok(setting)
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(SettingEnvelope {
        success: true,
        setting,
    }))
}

// GET /api/admin/audit-logs
pub async fn list_audit_logs(
    pool: web::Data<DbPool>,
    ident: Identity,
    query: web::Query<AuditQuery>,
) -> Result<HttpResponse, ServiceError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);

    let logs = web::block(move || -> Result<Vec<AuditLog>, ServiceError> {
        let mut conn = pool.get()?;
        database::require_role(&mut conn, ident.user_id, &[LoginType::Admin])?;
        audit_logs::table
            .order(audit_logs::created_at.desc())
            .limit(limit)
            .load(&mut conn)
            .map_err(Into::into)
    })
    .await??;

    Ok(HttpResponse::Ok().json(AuditListEnvelope {
        success: true,
        logs,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_values_are_checked_against_their_type() {
        assert!(validate_setting_value("true", "boolean").is_ok());
        assert!(validate_setting_value("yes", "boolean").is_err());
        assert!(validate_setting_value("42.5", "number").is_ok());
        assert!(validate_setting_value("{\"a\":1}", "json").is_ok());
        assert!(validate_setting_value("{", "json").is_err());
        assert!(validate_setting_value("anything", "string").is_ok());
        assert!(validate_setting_value("x", "blob").is_err());
    }

    #[test]
    fn pricing_rules_only_accept_known_fares_and_roles() {
        assert!(validate_rule("DAILY", &None).is_ok());
        assert!(validate_rule("MONTHLY", &Some(String::from("STUDENT"))).is_ok());
        assert!(validate_rule("WEEKLY", &None).is_err());
        assert!(validate_rule("DAILY", &Some(String::from("DRIVER"))).is_err());
    }
}
