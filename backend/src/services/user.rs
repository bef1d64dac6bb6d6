//! Profiles, compliance and supplier discovery

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    normalize_phone, validate_image_url, validate_location, validate_phone, ComplianceStatus,
    DiscoveryFilter, GeoPoint, PublicProfile, SupplierMatch, User, UserRole,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{map_unique_violation, AppError, AppResult};

/// User service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// Row shape of `users` as selected by this service
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub role: String,
    pub business_name: String,
    pub contact_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub compliance_status: String,
    pub license_number: Option<String>,
    pub reward_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_model(self) -> AppResult<User> {
        Ok(User {
            id: self.id,
            role: self.role.parse()?,
            business_name: self.business_name,
            contact_name: self.contact_name,
            email: self.email,
            phone: self.phone,
            location: location(self.latitude, self.longitude),
            compliance_status: self.compliance_status.parse()?,
            license_number: self.license_number,
            reward_points: self.reward_points,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    role: String,
    business_name: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    compliance_status: String,
    average_rating: Option<f64>,
    review_count: i64,
}

impl ProfileRow {
    fn into_model(self) -> AppResult<PublicProfile> {
        Ok(PublicProfile {
            id: self.id,
            role: self.role.parse()?,
            business_name: self.business_name,
            location: location(self.latitude, self.longitude),
            compliance_status: self.compliance_status.parse()?,
            average_rating: self.average_rating.map(|r| (r * 100.0).round() / 100.0),
            review_count: self.review_count,
        })
    }
}

fn location(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
        _ => None,
    }
}

/// Input for updating the caller's profile
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 200, message = "Business name cannot be empty"))]
    pub business_name: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Contact name cannot be empty"))]
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Compliance documents submitted for review
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitComplianceInput {
    #[validate(length(min = 3, max = 64, message = "Licence number must be 3 to 64 characters"))]
    pub license_number: String,
    pub document_url: String,
}

/// Operator decision on a pending submission
#[derive(Debug, Deserialize)]
pub struct ComplianceDecisionInput {
    pub status: ComplianceStatus,
}

/// Discovery query string
#[derive(Debug, Deserialize, Default)]
pub struct DiscoveryQuery {
    pub role: Option<UserRole>,
    #[serde(default)]
    pub verified_only: bool,
    /// Matches suppliers holding stock with this name
    pub item: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_km: Option<f64>,
    pub min_rating: Option<f64>,
}

impl DiscoveryQuery {
    fn filter(&self) -> AppResult<DiscoveryFilter> {
        let near = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                let centre = GeoPoint::new(lat, lon);
                validate_location(&centre).map_err(|e| AppError::validation("lat", e))?;
                Some(centre)
            }
            (None, None) => None,
            _ => {
                return Err(AppError::validation(
                    "lat",
                    "Both lat and lon are required for a location search",
                ))
            }
        };
        if let Some(radius) = self.radius_km {
            if near.is_none() {
                return Err(AppError::validation("radius_km", "radius_km needs lat and lon"));
            }
            if !(radius > 0.0) {
                return Err(AppError::validation("radius_km", "Radius must be positive"));
            }
        }
        Ok(DiscoveryFilter {
            role: self.role,
            verified_only: self.verified_only,
            near,
            radius_km: self.radius_km,
            min_rating: self.min_rating,
        })
    }
}

const USER_COLUMNS: &str = "id, role, business_name, contact_name, email, phone, latitude, longitude, \
     compliance_status, license_number, reward_points, created_at, updated_at";

const PROFILE_SELECT: &str = r#"
    SELECT u.id, u.role, u.business_name, u.latitude, u.longitude, u.compliance_status,
           AVG(r.rating)::float8 AS average_rating,
           COUNT(r.id) AS review_count
    FROM users u
    LEFT JOIN reviews r ON r.subject_id = u.id
"#;

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get the caller's full account
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?
        .into_model()
    }

    /// Public profile of any active business
    pub async fn get_public_profile(&self, user_id: Uuid) -> AppResult<PublicProfile> {
        sqlx::query_as::<_, ProfileRow>(&format!(
            "{} WHERE u.id = $1 AND u.is_active = true GROUP BY u.id",
            PROFILE_SELECT
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?
        .into_model()
    }

    /// Update the caller's profile; omitted fields keep their value
    pub async fn update_profile(&self, user_id: Uuid, input: UpdateProfileInput) -> AppResult<User> {
        input.validate()?;
        let phone = match input.phone.as_deref() {
            Some(phone) => {
                validate_phone(phone).map_err(|e| AppError::validation("phone", e))?;
                Some(normalize_phone(phone))
            }
            None => None,
        };
        if let Some(location) = &input.location {
            validate_location(location).map_err(|e| AppError::validation("location", e))?;
        }

        sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET business_name = COALESCE($2, business_name),
                contact_name = COALESCE($3, contact_name),
                phone = COALESCE($4, phone),
                latitude = COALESCE($5, latitude),
                longitude = COALESCE($6, longitude),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(input.business_name.as_deref().map(str::trim))
        .bind(input.contact_name.as_deref().map(str::trim))
        .bind(&phone)
        .bind(input.location.map(|l| l.latitude))
        .bind(input.location.map(|l| l.longitude))
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "phone"))?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?
        .into_model()
    }

    /// Submit compliance documents; the account goes to `pending`
    pub async fn submit_compliance(
        &self,
        user_id: Uuid,
        input: SubmitComplianceInput,
    ) -> AppResult<User> {
        input.validate()?;
        validate_image_url(&input.document_url)
            .map_err(|e| AppError::validation("document_url", e))?;

        let current = self.get_user(user_id).await?;
        if !current.compliance_status.can_submit() {
            return Err(AppError::InvalidStateTransition(
                "Compliance is already verified".to_string(),
            ));
        }

        sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET compliance_status = $2, license_number = $3, compliance_document_url = $4,
                updated_at = NOW()
            WHERE id = $1 AND compliance_status <> 'verified'
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(ComplianceStatus::Pending.as_str())
        .bind(input.license_number.trim())
        .bind(input.document_url.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Conflict("Compliance status changed concurrently".to_string()))?
        .into_model()
    }

    /// Record an operator decision on a pending submission
    pub async fn decide_compliance(
        &self,
        user_id: Uuid,
        input: ComplianceDecisionInput,
    ) -> AppResult<User> {
        let current = self.get_user(user_id).await?;
        if !current.compliance_status.can_decide(input.status) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot move compliance from {} to {}",
                current.compliance_status.as_str(),
                input.status.as_str()
            )));
        }

        let user = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET compliance_status = $2, updated_at = NOW()
            WHERE id = $1 AND compliance_status = 'pending'
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(input.status.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Conflict("Compliance status changed concurrently".to_string()))?
        .into_model()?;

        tracing::info!(user_id = %user.id, status = user.compliance_status.as_str(), "compliance decided");
        Ok(user)
    }

    /// Find suppliers and farmers
    pub async fn discover_suppliers(&self, query: DiscoveryQuery) -> AppResult<Vec<SupplierMatch>> {
        let filter = query.filter()?;
        let item = query
            .item
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")));

        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            {}
            WHERE u.is_active = true
              AND u.role IN ('supplier', 'farmer')
              AND ($1::text IS NULL OR EXISTS (
                    SELECT 1 FROM stock_items s
                    WHERE s.owner_id = u.id AND s.name ILIKE $1))
            GROUP BY u.id
            "#,
            PROFILE_SELECT
        ))
        .bind(&item)
        .fetch_all(&self.db)
        .await?;

        let candidates = rows
            .into_iter()
            .map(ProfileRow::into_model)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(filter.apply(candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_query_requires_both_coordinates() {
        let query = DiscoveryQuery {
            lat: Some(13.7),
            ..Default::default()
        };
        assert!(query.filter().is_err());

        let query = DiscoveryQuery {
            radius_km: Some(10.0),
            ..Default::default()
        };
        assert!(query.filter().is_err());

        let query = DiscoveryQuery {
            lat: Some(13.7),
            lon: Some(100.5),
            radius_km: Some(25.0),
            verified_only: true,
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert!(filter.verified_only);
        assert_eq!(filter.near, Some(GeoPoint::new(13.7, 100.5)));
    }

    #[test]
    fn discovery_query_rejects_bad_radius_and_coordinates() {
        let query = DiscoveryQuery {
            lat: Some(13.7),
            lon: Some(100.5),
            radius_km: Some(0.0),
            ..Default::default()
        };
        assert!(query.filter().is_err());

        let query = DiscoveryQuery {
            lat: Some(123.0),
            lon: Some(100.5),
            ..Default::default()
        };
        assert!(query.filter().is_err());
    }

    #[test]
    fn location_needs_both_columns() {
        assert_eq!(location(Some(1.0), None), None);
        assert_eq!(location(Some(1.0), Some(2.0)), Some(GeoPoint::new(1.0, 2.0)));
    }
}
