//! Marketplace participants

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::types::GeoPoint;

/// Business role of a marketplace account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Posts requirements and buys
    Vendor,
    /// Bids on requirements and ships
    Supplier,
    /// Sells produce directly; bids like a supplier
    Farmer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Vendor => "vendor",
            UserRole::Supplier => "supplier",
            UserRole::Farmer => "farmer",
        }
    }

    pub fn can_post_requirements(&self) -> bool {
        matches!(self, UserRole::Vendor)
    }

    pub fn can_submit_proposals(&self) -> bool {
        matches!(self, UserRole::Supplier | UserRole::Farmer)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vendor" => Ok(UserRole::Vendor),
            "supplier" => Ok(UserRole::Supplier),
            "farmer" => Ok(UserRole::Farmer),
            other => Err(LifecycleError::UnknownStatus {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// Compliance review state of an account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    #[default]
    Unsubmitted,
    Pending,
    Verified,
    Rejected,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Unsubmitted => "unsubmitted",
            ComplianceStatus::Pending => "pending",
            ComplianceStatus::Verified => "verified",
            ComplianceStatus::Rejected => "rejected",
        }
    }

    /// Documents can be (re)submitted unless already verified
    pub fn can_submit(&self) -> bool {
        !matches!(self, ComplianceStatus::Verified)
    }

    /// An operator decision is only valid for a pending submission
    pub fn can_decide(&self, decision: ComplianceStatus) -> bool {
        matches!(self, ComplianceStatus::Pending)
            && matches!(decision, ComplianceStatus::Verified | ComplianceStatus::Rejected)
    }
}

impl FromStr for ComplianceStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unsubmitted" => Ok(ComplianceStatus::Unsubmitted),
            "pending" => Ok(ComplianceStatus::Pending),
            "verified" => Ok(ComplianceStatus::Verified),
            "rejected" => Ok(ComplianceStatus::Rejected),
            other => Err(LifecycleError::UnknownStatus {
                kind: "compliance",
                value: other.to_string(),
            }),
        }
    }
}

/// A marketplace account as seen by its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub role: UserRole,
    pub business_name: String,
    pub contact_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
    pub compliance_status: ComplianceStatus,
    pub license_number: Option<String>,
    pub reward_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of another business
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub role: UserRole,
    pub business_name: String,
    pub location: Option<GeoPoint>,
    pub compliance_status: ComplianceStatus,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// A supplier or farmer returned by discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierMatch {
    #[serde(flatten)]
    pub profile: PublicProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Discovery filter applied after the candidate rows are loaded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryFilter {
    pub role: Option<UserRole>,
    #[serde(default)]
    pub verified_only: bool,
    pub near: Option<GeoPoint>,
    pub radius_km: Option<f64>,
    pub min_rating: Option<f64>,
}

impl DiscoveryFilter {
    /// Filter and rank candidates: nearest first when a centre is given,
    /// otherwise best rated first.
    pub fn apply(&self, candidates: Vec<PublicProfile>) -> Vec<SupplierMatch> {
        let mut matches: Vec<SupplierMatch> = candidates
            .into_iter()
            .filter(|p| p.role.can_submit_proposals())
            .filter(|p| self.role.map_or(true, |r| p.role == r))
            .filter(|p| !self.verified_only || p.compliance_status == ComplianceStatus::Verified)
            .filter(|p| match self.min_rating {
                Some(min) => p.average_rating.is_some_and(|r| r >= min),
                None => true,
            })
            .filter_map(|p| {
                let distance_km = match (self.near, p.location) {
                    (Some(centre), Some(loc)) => Some(centre.distance_km(&loc)),
                    (Some(_), None) if self.radius_km.is_some() => return None,
                    _ => None,
                };
                if let (Some(d), Some(radius)) = (distance_km, self.radius_km) {
                    if d > radius {
                        return None;
                    }
                }
                Some(SupplierMatch {
                    profile: p,
                    distance_km,
                })
            })
            .collect();

        if self.near.is_some() {
            matches.sort_by(|a, b| {
                a.distance_km
                    .unwrap_or(f64::MAX)
                    .total_cmp(&b.distance_km.unwrap_or(f64::MAX))
            });
        } else {
            matches.sort_by(|a, b| {
                b.profile
                    .average_rating
                    .unwrap_or(0.0)
                    .total_cmp(&a.profile.average_rating.unwrap_or(0.0))
            });
        }

        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: UserRole, location: Option<GeoPoint>, rating: Option<f64>) -> PublicProfile {
        PublicProfile {
            id: Uuid::new_v4(),
            role,
            business_name: "Acme".to_string(),
            location,
            compliance_status: ComplianceStatus::Verified,
            average_rating: rating,
            review_count: 0,
        }
    }

    #[test]
    fn role_round_trip_and_permissions() {
        for role in [UserRole::Vendor, UserRole::Supplier, UserRole::Farmer] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!(UserRole::Vendor.can_post_requirements());
        assert!(!UserRole::Vendor.can_submit_proposals());
        assert!(UserRole::Farmer.can_submit_proposals());
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn compliance_decisions_need_pending() {
        assert!(ComplianceStatus::Pending.can_decide(ComplianceStatus::Verified));
        assert!(!ComplianceStatus::Unsubmitted.can_decide(ComplianceStatus::Verified));
        assert!(!ComplianceStatus::Pending.can_decide(ComplianceStatus::Pending));
        assert!(!ComplianceStatus::Verified.can_submit());
    }

    #[test]
    fn discovery_excludes_vendors_and_far_suppliers() {
        let centre = GeoPoint::new(13.75, 100.50);
        let near = profile(UserRole::Supplier, Some(GeoPoint::new(13.80, 100.55)), Some(4.0));
        let far = profile(UserRole::Farmer, Some(GeoPoint::new(18.79, 98.98)), Some(5.0));
        let vendor = profile(UserRole::Vendor, Some(centre), Some(5.0));
        let near_id = near.id;

        let filter = DiscoveryFilter {
            near: Some(centre),
            radius_km: Some(50.0),
            ..Default::default()
        };
        let found = filter.apply(vec![far, vendor, near]);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].profile.id, near_id);
        assert!(found[0].distance_km.unwrap() < 10.0);
    }

    #[test]
    fn discovery_orders_by_rating_without_centre() {
        let low = profile(UserRole::Supplier, None, Some(3.0));
        let high = profile(UserRole::Supplier, None, Some(4.8));
        let unrated = profile(UserRole::Farmer, None, None);
        let high_id = high.id;

        let found = DiscoveryFilter::default().apply(vec![low, unrated, high]);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].profile.id, high_id);

        let rated = DiscoveryFilter {
            min_rating: Some(3.5),
            ..Default::default()
        }
        .apply(found.into_iter().map(|m| m.profile).collect());
        assert_eq!(rated.len(), 1);
    }
}
