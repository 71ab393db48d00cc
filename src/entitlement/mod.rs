//! Pure entitlement logic shared by the scanner endpoint, the pass and
//! ticket handlers and the reports. Nothing in here touches the database,
//! callers fetch the rows and hand them in together with `now`.

pub mod pricing;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::database::models::{
    Pass, PassType, Profile, Ticket, PASS_ACTIVE, PASS_EXPIRED, PASS_INACTIVE, PASS_PENDING,
    TICKET_PAID,
};

/// Single source of truth for "does this pass entitle travel right now".
pub fn is_pass_valid(pass: &Pass, now: NaiveDateTime) -> bool {
    pass.status == PASS_ACTIVE && pass.end_date.map_or(false, |end| end >= now)
}

/// Ticket counterpart. When `route_id` is given the ticket must also match
/// the route the scanning bus is serving.
pub fn is_ticket_valid(ticket: &Ticket, route_id: Option<i32>, now: NaiveDateTime) -> bool {
    ticket.payment_status == TICKET_PAID
        && ticket.valid_until >= now
        && route_id.map_or(true, |id| ticket.route_id == id)
}

/// A rider may hold at most one open pass. PENDING always blocks a new
/// request, ACTIVE blocks while the window is still running. An ACTIVE
/// pass whose end date has elapsed does not block, expiry is never
/// written back.
pub fn has_open_pass(passes: &[Pass], now: NaiveDateTime) -> bool {
    passes
        .iter()
        .any(|pass| pass.status == PASS_PENDING || is_pass_valid(pass, now))
}

/// Status and validity window a pass moves to when a manager decides on
/// it. Anything not PENDING is no longer decidable, a disabled or already
/// processed pass yields None and the caller answers 409.
pub fn approval_transition(
    current_status: &str,
    approve: bool,
    pass_type: PassType,
    now: NaiveDateTime,
) -> Option<(&'static str, Option<NaiveDateTime>, Option<NaiveDateTime>)> {
    if current_status != PASS_PENDING {
        return None;
    }
    if approve {
        let end = now + pricing::pass_duration(pass_type);
        Some((PASS_ACTIVE, Some(now), Some(end)))
    } else {
        Some((PASS_INACTIVE, None, None))
    }
}

/// Read-time expiry projection. An ACTIVE pass whose window has elapsed is
/// shown as EXPIRED without ever writing that state back.
pub fn projected_status(pass: &Pass, now: NaiveDateTime) -> &'static str {
    if pass.status == PASS_ACTIVE && pass.end_date.map_or(false, |end| end < now) {
        PASS_EXPIRED
    } else {
        match pass.status.as_str() {
            "PENDING" => "PENDING",
            "ACTIVE" => "ACTIVE",
            "INACTIVE" => "INACTIVE",
            "DISABLED" => "DISABLED",
            _ => PASS_EXPIRED,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScannedUser {
    pub full_name: String,
    pub role_type: String,
    pub id_number: String,
    pub class_or_position: Option<String>,
    pub phone: Option<String>,
    pub guardian_phone: Option<String>,
    pub photo: Option<String>,
}

impl From<&Profile> for ScannedUser {
    fn from(profile: &Profile) -> ScannedUser {
        ScannedUser {
            full_name: profile.full_name.clone(),
            role_type: profile.role_type.clone(),
            id_number: profile.id_number.clone(),
            class_or_position: profile.class_or_position.clone(),
            phone: profile.phone.clone(),
            guardian_phone: profile.guardian_phone.clone(),
            photo: profile.photo.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PassSnapshot {
    #[serde(rename = "type")]
    pub pass_type: String,
    pub end_date: NaiveDateTime,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TicketSnapshot {
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub valid_until: NaiveDateTime,
}

/// Scanner response. Always returned with HTTP 200, an unknown qr id or a
/// rider without entitlement is a regular `valid: false` answer.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ScannedUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<PassSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<TicketSnapshot>,
    pub message: String,
}

impl Verification {
    pub fn outcome(&self) -> &'static str {
        if self.valid {
            "VALID"
        } else {
            "INVALID"
        }
    }
}

/// Resolution policy for a scan: unknown qr id first, then an active pass,
/// then a paid unexpired ticket for the scanned route.
pub fn resolve(
    profile: Option<&Profile>,
    passes: &[Pass],
    tickets: &[Ticket],
    route_id: Option<i32>,
    now: NaiveDateTime,
) -> Verification {
    let profile = match profile {
        Some(profile) => profile,
        None => {
            return Verification {
                valid: false,
                user: None,
                pass: None,
                ticket: None,
                message: String::from("Unknown QR code"),
            }
        }
    };

    let user = Some(ScannedUser::from(profile));

    if let Some(pass) = passes.iter().find(|pass| is_pass_valid(pass, now)) {
        return Verification {
            valid: true,
            user,
            pass: Some(PassSnapshot {
                pass_type: pass.pass_type.clone(),
                // is_pass_valid guarantees the end date exists
                end_date: pass.end_date.unwrap_or(now),
            }),
            ticket: None,
            message: String::from("Active pass"),
        };
    }

    if let Some(ticket) = tickets
        .iter()
        .find(|ticket| is_ticket_valid(ticket, route_id, now))
    {
        return Verification {
            valid: true,
            user,
            pass: None,
            ticket: Some(TicketSnapshot {
                ticket_type: ticket.ticket_type.clone(),
                valid_until: ticket.valid_until,
            }),
            message: String::from("Valid ticket"),
        };
    }

    Verification {
        valid: false,
        user,
        pass: None,
        ticket: None,
        message: String::from("No active pass or ticket"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn sample_profile() -> Profile {
        Profile {
            id: 1,
            user_id: Uuid::new_v4(),
            full_name: String::from("Asha Verma"),
            id_number: String::from("STU-1042"),
            class_or_position: Some(String::from("B.Sc II")),
            phone: Some(String::from("9876543210")),
            address: None,
            guardian_name: None,
            guardian_phone: Some(String::from("9876500000")),
            bio: None,
            photo: None,
            qr_id: Uuid::new_v4().to_string(),
            role_type: String::from("STUDENT"),
        }
    }

    fn pass_with(status: &str, end_offset_days: i64) -> Pass {
        let now = Utc::now().naive_utc();
        Pass {
            id: 7,
            pass_code: String::from("PASS-AB12CD34"),
            pass_type: String::from("MONTHLY"),
            status: status.to_string(),
            start_date: Some(now - Duration::days(5)),
            end_date: Some(now + Duration::days(end_offset_days)),
            created_at: now - Duration::days(5),
            user_id: Uuid::new_v4(),
        }
    }

    fn ticket_with(payment_status: &str, route_id: i32, valid_offset_days: i64) -> Ticket {
        let now = Utc::now().naive_utc();
        Ticket {
            id: 3,
            user_id: Uuid::new_v4(),
            route_id,
            ticket_type: String::from("DAILY"),
            price: 40,
            payment_status: payment_status.to_string(),
            purchase_date: now,
            valid_until: now + Duration::days(valid_offset_days),
        }
    }

    #[test]
    fn unknown_qr_id_resolves_invalid_without_user() {
        let result = resolve(None, &[], &[], None, Utc::now().naive_utc());
        assert!(!result.valid);
        assert!(result.user.is_none());
        assert_eq!(result.message, "Unknown QR code");
    }

    #[test]
    fn active_pass_wins_over_tickets() {
        let profile = sample_profile();
        let passes = [pass_with("ACTIVE", 10)];
        let tickets = [ticket_with("PAID", 1, 1)];
        let result = resolve(
            Some(&profile),
            &passes,
            &tickets,
            None,
            Utc::now().naive_utc(),
        );
        assert!(result.valid);
        assert!(result.pass.is_some());
        assert!(result.ticket.is_none());
        assert_eq!(result.user.unwrap().full_name, "Asha Verma");
    }

    #[test]
    fn expired_pass_falls_through_to_ticket() {
        let profile = sample_profile();
        let passes = [pass_with("ACTIVE", -1)];
        let tickets = [ticket_with("PAID", 4, 1)];
        let result = resolve(
            Some(&profile),
            &passes,
            &tickets,
            Some(4),
            Utc::now().naive_utc(),
        );
        assert!(result.valid);
        assert!(result.pass.is_none());
        assert_eq!(result.ticket.unwrap().ticket_type, "DAILY");
    }

    #[test]
    fn ticket_for_another_route_does_not_count() {
        let profile = sample_profile();
        let tickets = [ticket_with("PAID", 4, 1)];
        let result = resolve(
            Some(&profile),
            &[],
            &tickets,
            Some(9),
            Utc::now().naive_utc(),
        );
        assert!(!result.valid);
        assert_eq!(result.message, "No active pass or ticket");
    }

    #[test]
    fn unpaid_ticket_does_not_count() {
        let profile = sample_profile();
        let tickets = [ticket_with("PENDING", 4, 1)];
        let result = resolve(
            Some(&profile),
            &[],
            &tickets,
            Some(4),
            Utc::now().naive_utc(),
        );
        assert!(!result.valid);
    }

    #[test]
    fn pending_pass_is_not_valid_for_travel() {
        let now = Utc::now().naive_utc();
        let mut pass = pass_with("PENDING", 10);
        pass.start_date = None;
        pass.end_date = None;
        assert!(!is_pass_valid(&pass, now));
    }

    #[test]
    fn pending_and_live_passes_block_a_new_request() {
        let now = Utc::now().naive_utc();
        assert!(has_open_pass(&[pass_with("PENDING", 10)], now));
        assert!(has_open_pass(&[pass_with("ACTIVE", 10)], now));
    }

    #[test]
    fn elapsed_or_closed_passes_do_not_block_a_new_request() {
        let now = Utc::now().naive_utc();
        assert!(!has_open_pass(&[pass_with("ACTIVE", -1)], now));
        assert!(!has_open_pass(&[pass_with("INACTIVE", 10)], now));
        assert!(!has_open_pass(&[pass_with("DISABLED", 10)], now));
        assert!(!has_open_pass(&[], now));
    }

    #[test]
    fn approving_a_pending_pass_opens_the_validity_window() {
        let now = Utc::now().naive_utc();
        let (status, start, end) =
            approval_transition("PENDING", true, PassType::Monthly, now).unwrap();
        assert_eq!(status, "ACTIVE");
        assert_eq!(start, Some(now));
        assert_eq!(end, Some(now + Duration::days(30)));

        let (_, _, end) = approval_transition("PENDING", true, PassType::Yearly, now).unwrap();
        assert_eq!(end, Some(now + Duration::days(365)));
    }

    #[test]
    fn rejecting_a_pending_pass_closes_it_without_a_window() {
        let now = Utc::now().naive_utc();
        let (status, start, end) =
            approval_transition("PENDING", false, PassType::Monthly, now).unwrap();
        assert_eq!(status, "INACTIVE");
        assert!(start.is_none());
        assert!(end.is_none());
    }

    #[test]
    fn only_pending_passes_are_decidable() {
        let now = Utc::now().naive_utc();
        for status in ["ACTIVE", "INACTIVE", "DISABLED", "EXPIRED"] {
            assert!(approval_transition(status, true, PassType::Monthly, now).is_none());
            assert!(approval_transition(status, false, PassType::Monthly, now).is_none());
        }
    }

    #[test]
    fn elapsed_active_pass_projects_expired() {
        let now = Utc::now().naive_utc();
        let pass = pass_with("ACTIVE", -2);
        assert_eq!(projected_status(&pass, now), "EXPIRED");
        let live = pass_with("ACTIVE", 2);
        assert_eq!(projected_status(&live, now), "ACTIVE");
        let pending = pass_with("PENDING", -2);
        assert_eq!(projected_status(&pending, now), "PENDING");
    }
}
