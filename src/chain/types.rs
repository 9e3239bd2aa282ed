use serde::{Deserialize, Serialize};

/// Zero address returned by the contract for tokens that were never rented.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// A token's current rental state as stored by the marketplace contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalRecord {
    pub token_id: u64,
    /// Renter wallet address; zero address when unrented.
    pub renter: String,
    /// Contact email supplied at rental time, if any.
    pub renter_contact: Option<String>,
    /// Unix timestamp (seconds) when the rental began.
    pub start_time: i64,
    /// Rental validity in seconds.
    pub duration: i64,
    pub rental_fee: u128,
    pub is_rented: bool,
}

impl RentalRecord {
    pub fn end_time(&self) -> i64 {
        self.start_time + self.duration
    }

    /// Seconds until the rental ends, relative to `now`. Negative once expired.
    pub fn remaining_time(&self, now: i64) -> i64 {
        self.end_time() - now
    }

    pub fn has_contact(&self) -> bool {
        self.renter_contact
            .as_deref()
            .map(|c| !c.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start_time: i64, duration: i64) -> RentalRecord {
        RentalRecord {
            token_id: 1,
            renter: "0x1111111111111111111111111111111111111111".to_string(),
            renter_contact: Some("renter@example.com".to_string()),
            start_time,
            duration,
            rental_fee: 0,
            is_rented: true,
        }
    }

    #[test]
    fn test_remaining_time() {
        let r = record(1_000, 3_600);
        assert_eq!(r.end_time(), 4_600);
        assert_eq!(r.remaining_time(4_000), 600);
        assert_eq!(r.remaining_time(4_600), 0);
        assert_eq!(r.remaining_time(5_000), -400);
    }

    #[test]
    fn test_has_contact() {
        let mut r = record(0, 60);
        assert!(r.has_contact());
        r.renter_contact = Some(String::new());
        assert!(!r.has_contact());
        r.renter_contact = None;
        assert!(!r.has_contact());
    }
}
