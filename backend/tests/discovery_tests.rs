//! Tests for supplier discovery and input validation

use chrono::Utc;
use proptest::prelude::*;
use shared::{
    normalize_phone, validate_email, validate_phone, validate_rating, ComplianceStatus,
    DiscoveryFilter, GeoPoint, PublicProfile, UserRole,
};
use uuid::Uuid;

fn profile(role: UserRole, location: Option<GeoPoint>, rating: Option<f64>) -> PublicProfile {
    PublicProfile {
        id: Uuid::new_v4(),
        role,
        business_name: format!("{} {}", role, Utc::now().timestamp_micros()),
        location,
        compliance_status: ComplianceStatus::Verified,
        average_rating: rating,
        review_count: i64::from(rating.is_some()),
    }
}

mod discovery {
    use super::*;

    #[test]
    fn vendors_are_never_listed() {
        let filter = DiscoveryFilter::default();
        let matches = filter.apply(vec![
            profile(UserRole::Vendor, None, None),
            profile(UserRole::Supplier, None, None),
            profile(UserRole::Farmer, None, None),
        ]);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.profile.role != UserRole::Vendor));
    }

    #[test]
    fn nearest_first_within_radius() {
        let centre = GeoPoint::new(13.7563, 100.5018);
        let near = profile(UserRole::Supplier, Some(GeoPoint::new(13.80, 100.55)), None);
        let far = profile(UserRole::Supplier, Some(GeoPoint::new(18.79, 98.98)), None);
        let nowhere = profile(UserRole::Supplier, None, None);

        let filter = DiscoveryFilter {
            near: Some(centre),
            radius_km: Some(50.0),
            ..Default::default()
        };
        let matches = filter.apply(vec![far, nowhere, near.clone()]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].profile.id, near.id);
        assert!(matches[0].distance_km.unwrap() < 10.0);
    }

    #[test]
    fn unverified_and_low_rated_are_filtered() {
        let mut pending = profile(UserRole::Farmer, None, Some(4.8));
        pending.compliance_status = ComplianceStatus::Pending;
        let low = profile(UserRole::Farmer, None, Some(2.0));
        let good = profile(UserRole::Farmer, None, Some(4.5));

        let filter = DiscoveryFilter {
            verified_only: true,
            min_rating: Some(4.0),
            ..Default::default()
        };
        let matches = filter.apply(vec![pending, low, good.clone()]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].profile.id, good.id);
    }
}

mod account_validation {
    use super::*;

    #[test]
    fn email_format() {
        assert!(validate_email("buyer@example.com").is_ok());
        assert!(validate_email("buyer@example").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn phone_numbers_normalize_to_digits() {
        assert!(validate_phone("+66 81-234-5678").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("+66 (81) 234").is_err());
        assert_eq!(normalize_phone("+66 81-234-5678"), "+66812345678");
    }

    #[test]
    fn ratings_are_one_to_five() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}

fn point_strategy() -> impl Strategy<Value = GeoPoint> {
    (-89.0f64..89.0, -179.0f64..179.0).prop_map(|(lat, lon)| GeoPoint::new(lat, lon))
}

proptest! {
    #[test]
    fn distance_is_symmetric_and_bounded(a in point_strategy(), b in point_strategy()) {
        let ab = a.distance_km(&b);
        let ba = b.distance_km(&a);
        prop_assert!((ab - ba).abs() < 1e-6);
        prop_assert!(ab >= 0.0);
        // Half the earth's circumference
        prop_assert!(ab <= 20_016.0);
    }

    #[test]
    fn radius_filter_never_returns_farther_matches(
        centre in point_strategy(),
        points in prop::collection::vec(point_strategy(), 0..20),
        radius in 1.0f64..5_000.0,
    ) {
        let candidates = points
            .into_iter()
            .map(|p| profile(UserRole::Supplier, Some(p), None))
            .collect();
        let filter = DiscoveryFilter {
            near: Some(centre),
            radius_km: Some(radius),
            ..Default::default()
        };
        let matches = filter.apply(candidates);
        for pair in matches.windows(2) {
            prop_assert!(pair[0].distance_km <= pair[1].distance_km);
        }
        for m in &matches {
            prop_assert!(m.distance_km.unwrap() <= radius);
        }
    }
}
