use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{
    audit_logs, bus_routes, buses, notifications, passes, payments, pricing_rules, profiles,
    roles, system_settings, tickets, users,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginType {
    Student,
    Staff,
    Conductor,
    Manager,
    Admin,
}

impl LoginType {
    pub fn parse(raw: &str) -> Option<LoginType> {
        match raw {
            "STUDENT" => Some(LoginType::Student),
            "STAFF" => Some(LoginType::Staff),
            "CONDUCTOR" => Some(LoginType::Conductor),
            "MANAGER" => Some(LoginType::Manager),
            "ADMIN" => Some(LoginType::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoginType::Student => "STUDENT",
            LoginType::Staff => "STAFF",
            LoginType::Conductor => "CONDUCTOR",
            LoginType::Manager => "MANAGER",
            LoginType::Admin => "ADMIN",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassType {
    Monthly,
    Yearly,
}

impl PassType {
    pub fn parse(raw: &str) -> Option<PassType> {
        match raw {
            "MONTHLY" => Some(PassType::Monthly),
            "YEARLY" => Some(PassType::Yearly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PassType::Monthly => "MONTHLY",
            PassType::Yearly => "YEARLY",
        }
    }
}

// Pass status values. EXPIRED is never written, it is projected at read
// time once end_date lies in the past.
pub const PASS_PENDING: &str = "PENDING";
pub const PASS_ACTIVE: &str = "ACTIVE";
pub const PASS_INACTIVE: &str = "INACTIVE";
pub const PASS_DISABLED: &str = "DISABLED";
pub const PASS_EXPIRED: &str = "EXPIRED";

pub const PAYMENT_PENDING: &str = "PENDING";
pub const PAYMENT_VERIFIED: &str = "VERIFIED";
pub const PAYMENT_REJECTED: &str = "REJECTED";

pub const TICKET_UNPAID: &str = "PENDING";
pub const TICKET_PAID: &str = "PAID";
pub const TICKET_REJECTED: &str = "REJECTED";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "INFO",
            NotificationKind::Success => "SUCCESS",
            NotificationKind::Warning => "WARNING",
            NotificationKind::Error => "ERROR",
        }
    }
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub role_type: String,
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub login_type: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub login_type: String,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i32,
    pub user_id: Uuid,
    pub full_name: String,
    pub id_number: String,
    pub class_or_position: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
    pub qr_id: String,
    pub role_type: String,
}

#[derive(Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub full_name: String,
    pub id_number: String,
    pub class_or_position: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
    pub qr_id: String,
    pub role_type: String,
}

#[derive(AsChangeset, Deserialize, Debug)]
#[diesel(table_name = profiles)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub class_or_position: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Pass {
    pub id: i32,
    pub pass_code: String,
    #[serde(rename = "type")]
    pub pass_type: String,
    pub status: String,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub user_id: Uuid,
}

#[derive(Insertable)]
#[diesel(table_name = passes)]
pub struct NewPass {
    pub pass_code: String,
    pub pass_type: String,
    pub status: String,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub user_id: Uuid,
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i32,
    pub user_id: Uuid,
    pub route_id: i32,
    pub ticket_type: String,
    pub price: i32,
    pub payment_status: String,
    pub purchase_date: NaiveDateTime,
    pub valid_until: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = tickets)]
pub struct NewTicket {
    pub user_id: Uuid,
    pub route_id: i32,
    pub ticket_type: String,
    pub price: i32,
    pub payment_status: String,
    pub purchase_date: NaiveDateTime,
    pub valid_until: NaiveDateTime,
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i32,
    pub user_id: Uuid,
    pub pass_id: Option<i32>,
    pub ticket_id: Option<i32>,
    pub amount: i32,
    pub method: String,
    pub reference: Option<String>,
    pub proof_url: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub pass_id: Option<i32>,
    pub ticket_id: Option<i32>,
    pub amount: i32,
    pub method: String,
    pub reference: Option<String>,
    pub proof_url: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BusRoute {
    pub id: i32,
    pub name: String,
    pub stops: Vec<String>,
    pub schedule_times: Vec<String>,
    pub active: bool,
}

#[derive(Insertable)]
#[diesel(table_name = bus_routes)]
pub struct NewBusRoute {
    pub name: String,
    pub stops: Vec<String>,
    pub schedule_times: Vec<String>,
    pub active: bool,
}

#[derive(AsChangeset, Deserialize, Debug)]
#[diesel(table_name = bus_routes)]
#[serde(rename_all = "camelCase")]
pub struct BusRouteUpdate {
    pub name: Option<String>,
    pub stops: Option<Vec<String>>,
    pub schedule_times: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: i32,
    pub number_plate: String,
    pub from_stop: String,
    pub to_stop: String,
    pub departure: String,
    pub arrival: String,
    pub total_seats: i32,
    pub route_id: Option<i32>,
    pub conductor_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Insertable)]
#[diesel(table_name = buses)]
pub struct NewBus {
    pub number_plate: String,
    pub from_stop: String,
    pub to_stop: String,
    pub departure: String,
    pub arrival: String,
    pub total_seats: i32,
    pub route_id: Option<i32>,
    pub conductor_id: Option<Uuid>,
    pub active: bool,
}

#[derive(AsChangeset, Deserialize, Debug)]
#[diesel(table_name = buses)]
#[serde(rename_all = "camelCase")]
pub struct BusUpdate {
    pub number_plate: Option<String>,
    pub from_stop: Option<String>,
    pub to_stop: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub total_seats: Option<i32>,
    pub route_id: Option<i32>,
    pub conductor_id: Option<Uuid>,
    pub active: Option<bool>,
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i32,
    pub user_id: Option<Uuid>,
    pub broadcast_role: Option<String>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub user_id: Option<Uuid>,
    pub broadcast_role: Option<String>,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Insertable, Serialize, Debug, Clone)]
#[diesel(table_name = system_settings)]
#[serde(rename_all = "camelCase")]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub category: String,
    pub description: Option<String>,
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: i32,
    pub actor: Option<Uuid>,
    pub action: String,
    pub subject: String,
    pub outcome: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = audit_logs)]
pub struct NewAuditLog {
    pub actor: Option<Uuid>,
    pub action: String,
    pub subject: String,
    pub outcome: String,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PricingRule {
    pub id: i32,
    pub ticket_type: String,
    pub role_type: Option<String>,
    pub price: i32,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = pricing_rules)]
#[serde(rename_all = "camelCase")]
pub struct NewPricingRule {
    pub ticket_type: String,
    pub role_type: Option<String>,
    pub price: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_type_round_trips_through_strings() {
        for raw in ["STUDENT", "STAFF", "CONDUCTOR", "MANAGER", "ADMIN"] {
            let parsed = LoginType::parse(raw).unwrap();
            assert_eq!(parsed.as_str(), raw);
        }
        assert!(LoginType::parse("DRIVER").is_none());
    }

    #[test]
    fn pass_type_rejects_ticket_kinds() {
        assert_eq!(PassType::parse("MONTHLY"), Some(PassType::Monthly));
        assert_eq!(PassType::parse("YEARLY"), Some(PassType::Yearly));
        assert!(PassType::parse("DAILY").is_none());
    }
}
