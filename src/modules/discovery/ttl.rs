//! Rating-driven freshness windows for series metadata.
//!
//! Highly rated series get rewatched and browsed far more often, so their
//! metadata is kept fresh longer before a re-discovery becomes worthwhile.

/// Freshness window for series with no rating signal at all.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Map an average episode rating (0.0..=10.0) to a TTL in days.
pub fn calculate_ttl_days(rating: Option<f64>) -> i64 {
    match rating {
        Some(r) if r >= 8.5 => 30,
        Some(r) if r >= 7.0 => 21,
        Some(r) if r >= 5.5 => 14,
        Some(r) if r >= 4.0 => 7,
        Some(_) => 3,
        None => DEFAULT_TTL_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_ratings_get_longer_ttls() {
        assert_eq!(calculate_ttl_days(Some(9.2)), 30);
        assert_eq!(calculate_ttl_days(Some(7.5)), 21);
        assert_eq!(calculate_ttl_days(Some(6.0)), 14);
        assert_eq!(calculate_ttl_days(Some(4.5)), 7);
        assert_eq!(calculate_ttl_days(Some(2.0)), 3);
    }

    #[test]
    fn ttl_is_monotonic_in_rating() {
        let mut last = 0;
        for tenth in 0..=100 {
            let ttl = calculate_ttl_days(Some(tenth as f64 / 10.0));
            assert!(ttl >= last, "ttl decreased at rating {}", tenth as f64 / 10.0);
            last = ttl;
        }
    }

    #[test]
    fn unknown_rating_uses_default() {
        assert_eq!(calculate_ttl_days(None), DEFAULT_TTL_DAYS);
    }

    #[test]
    fn boundary_values_land_in_the_higher_band() {
        assert_eq!(calculate_ttl_days(Some(8.5)), 30);
        assert_eq!(calculate_ttl_days(Some(7.0)), 21);
        assert_eq!(calculate_ttl_days(Some(5.5)), 14);
        assert_eq!(calculate_ttl_days(Some(4.0)), 7);
    }
}
