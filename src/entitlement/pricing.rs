use chrono::Duration;

use crate::database::models::{LoginType, PassType};

/// Fare classes a price can be quoted for. Daily fares belong to tickets,
/// monthly and yearly fares to passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FareClass {
    Daily,
    Monthly,
    Yearly,
}

impl FareClass {
    pub fn parse(raw: &str) -> Option<FareClass> {
        match raw {
            "DAILY" => Some(FareClass::Daily),
            "MONTHLY" => Some(FareClass::Monthly),
            "YEARLY" => Some(FareClass::Yearly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FareClass::Daily => "DAILY",
            FareClass::Monthly => "MONTHLY",
            FareClass::Yearly => "YEARLY",
        }
    }
}

impl From<PassType> for FareClass {
    fn from(pass_type: PassType) -> FareClass {
        match pass_type {
            PassType::Monthly => FareClass::Monthly,
            PassType::Yearly => FareClass::Yearly,
        }
    }
}

/// Built-in fare table in INR. The pricing_rules table can override any
/// entry, this is the fallback when no rule matches.
pub fn list_price(fare: FareClass, role: LoginType) -> i32 {
    match fare {
        FareClass::Daily => match role {
            LoginType::Student => 40,
            LoginType::Staff => 45,
            // bus crew and back office travel free
            LoginType::Conductor | LoginType::Manager | LoginType::Admin => 0,
        },
        FareClass::Monthly => 500,
        FareClass::Yearly => 5000,
    }
}

pub fn pass_duration(pass_type: PassType) -> Duration {
    match pass_type {
        PassType::Monthly => Duration::days(30),
        PassType::Yearly => Duration::days(365),
    }
}

pub fn ticket_duration() -> Duration {
    Duration::days(1)
}

/// UPI deep link the payment QR code encodes.
pub fn upi_deep_link(upi_id: &str, merchant_name: &str, amount: i32) -> String {
    format!(
        "upi://pay?pa={}&pn={}&am={}&cu=INR",
        upi_id,
        urlencoding::encode(merchant_name),
        amount
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_fares_depend_on_role() {
        assert_eq!(list_price(FareClass::Daily, LoginType::Student), 40);
        assert_eq!(list_price(FareClass::Daily, LoginType::Staff), 45);
        assert_eq!(list_price(FareClass::Daily, LoginType::Admin), 0);
        assert_eq!(list_price(FareClass::Daily, LoginType::Manager), 0);
    }

    #[test]
    fn pass_fares_ignore_role() {
        for role in [LoginType::Student, LoginType::Staff, LoginType::Admin] {
            assert_eq!(list_price(FareClass::Monthly, role), 500);
            assert_eq!(list_price(FareClass::Yearly, role), 5000);
        }
    }

    #[test]
    fn durations_match_fare_windows() {
        assert_eq!(pass_duration(PassType::Monthly), Duration::days(30));
        assert_eq!(pass_duration(PassType::Yearly), Duration::days(365));
        assert_eq!(ticket_duration(), Duration::days(1));
    }

    #[test]
    fn upi_link_urlencodes_the_merchant() {
        let link = upi_deep_link("depot@upi", "City Bus Depot", 500);
        assert_eq!(
            link,
            "upi://pay?pa=depot@upi&pn=City%20Bus%20Depot&am=500&cu=INR"
        );
    }
}
