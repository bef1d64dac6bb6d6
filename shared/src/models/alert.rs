//! In-app alerts and their text templates

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LifecycleError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::Low => "low",
            AlertPriority::Medium => "medium",
            AlertPriority::High => "high",
        }
    }

    /// Map a free-form urgency word onto a priority
    pub fn from_urgency(urgency: &str) -> Self {
        match urgency.trim().to_ascii_lowercase().as_str() {
            "high" | "urgent" | "critical" | "immediate" => AlertPriority::High,
            "low" | "minor" | "info" => AlertPriority::Low,
            _ => AlertPriority::Medium,
        }
    }
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertPriority {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(AlertPriority::Low),
            "medium" => Ok(AlertPriority::Medium),
            "high" => Ok(AlertPriority::High),
            other => Err(LifecycleError::UnknownStatus {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// A stored alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_type: String,
    pub title: String,
    pub message: String,
    pub priority: AlertPriority,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Inputs to the alert text generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRequest {
    pub event_type: String,
    pub details: String,
    #[serde(default)]
    pub user_behavior: String,
    #[serde(default)]
    pub urgency: String,
}

/// Title/message/priority triple produced for an alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedAlert {
    pub title: String,
    pub message: String,
    pub priority: AlertPriority,
}

impl AlertRequest {
    /// Prompt sent to the text-generation service
    pub fn render_prompt(&self) -> String {
        format!(
            "You write short notifications for a B2B supply-chain marketplace.\n\
             Event type: {}\n\
             Details: {}\n\
             User behavior: {}\n\
             Urgency: {}\n\
             Respond with JSON only: {{\"title\": string (max 60 chars), \
             \"message\": string (max 200 chars), \"priority\": \"low\"|\"medium\"|\"high\"}}",
            self.event_type,
            self.details,
            if self.user_behavior.is_empty() { "unknown" } else { &self.user_behavior },
            if self.urgency.is_empty() { "medium" } else { &self.urgency },
        )
    }

    /// Local rendering used when no generator is available
    pub fn fallback(&self) -> GeneratedAlert {
        let title = humanize(&self.event_type);
        GeneratedAlert {
            title: truncate(&title, 60),
            message: truncate(self.details.trim(), 200),
            priority: AlertPriority::from_urgency(&self.urgency),
        }
    }
}

impl GeneratedAlert {
    /// Clamp generator output to what the UI can show
    pub fn normalized(self) -> Self {
        Self {
            title: truncate(self.title.trim(), 60),
            message: truncate(self.message.trim(), 200),
            priority: self.priority,
        }
    }
}

/// Alerts raised by marketplace events
#[derive(Debug, Clone, PartialEq)]
pub enum EventAlert {
    ProposalReceived { item_name: String, amount: Decimal },
    CounterOfferReceived { item_name: String, amount: Decimal },
    ProposalAccepted { item_name: String, amount: Decimal },
    ProposalRejected { item_name: String },
    OrderShipped { item_name: String },
    OrderReceived { item_name: String, points: i32 },
}

impl EventAlert {
    pub fn event_type(&self) -> &'static str {
        match self {
            EventAlert::ProposalReceived { .. } => "proposal_received",
            EventAlert::CounterOfferReceived { .. } => "counter_offer",
            EventAlert::ProposalAccepted { .. } => "proposal_accepted",
            EventAlert::ProposalRejected { .. } => "proposal_rejected",
            EventAlert::OrderShipped { .. } => "order_shipped",
            EventAlert::OrderReceived { .. } => "order_received",
        }
    }

    pub fn render(&self) -> GeneratedAlert {
        let (title, message, priority) = match self {
            EventAlert::ProposalReceived { item_name, amount } => (
                "New proposal".to_string(),
                format!("A supplier offered {} per unit for {}.", amount, item_name),
                AlertPriority::Medium,
            ),
            EventAlert::CounterOfferReceived { item_name, amount } => (
                "Counter-offer received".to_string(),
                format!("New counter-offer of {} per unit on {}.", amount, item_name),
                AlertPriority::High,
            ),
            EventAlert::ProposalAccepted { item_name, amount } => (
                "Proposal accepted".to_string(),
                format!("Your offer of {} per unit for {} was accepted. An order has been placed.", amount, item_name),
                AlertPriority::High,
            ),
            EventAlert::ProposalRejected { item_name } => (
                "Proposal declined".to_string(),
                format!("Your proposal for {} was not selected.", item_name),
                AlertPriority::Low,
            ),
            EventAlert::OrderShipped { item_name } => (
                "Order shipped".to_string(),
                format!("Your order of {} is on its way.", item_name),
                AlertPriority::Medium,
            ),
            EventAlert::OrderReceived { item_name, points } => (
                "Order received".to_string(),
                format!("The buyer confirmed delivery of {}. You earned {} reward points.", item_name, points),
                AlertPriority::Medium,
            ),
        };
        GeneratedAlert {
            title,
            message,
            priority,
        }
        .normalized()
    }
}

fn humanize(event_type: &str) -> String {
    let words: Vec<String> = event_type
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect();
    let mut title = words.join(" ");
    if let Some(first) = title.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    if title.is_empty() {
        "Notification".to_string()
    } else {
        title
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_maps_to_priority() {
        assert_eq!(AlertPriority::from_urgency("URGENT"), AlertPriority::High);
        assert_eq!(AlertPriority::from_urgency(" low "), AlertPriority::Low);
        assert_eq!(AlertPriority::from_urgency(""), AlertPriority::Medium);
    }

    #[test]
    fn fallback_humanizes_event_type() {
        let req = AlertRequest {
            event_type: "price_drop".to_string(),
            details: "Rice prices fell 5% this week".to_string(),
            user_behavior: String::new(),
            urgency: "high".to_string(),
        };
        let alert = req.fallback();
        assert_eq!(alert.title, "Price drop");
        assert_eq!(alert.priority, AlertPriority::High);
        assert!(req.render_prompt().contains("Urgency: high"));
        assert!(req.render_prompt().contains("User behavior: unknown"));
    }

    #[test]
    fn normalized_clamps_lengths() {
        let long = GeneratedAlert {
            title: "t".repeat(100),
            message: "m".repeat(500),
            priority: AlertPriority::Low,
        }
        .normalized();
        assert_eq!(long.title.chars().count(), 60);
        assert_eq!(long.message.chars().count(), 200);
    }

    #[test]
    fn event_alerts_render() {
        let alert = EventAlert::OrderReceived {
            item_name: "Maize".to_string(),
            points: 10,
        }
        .render();
        assert!(alert.message.contains("10 reward points"));
        assert_eq!(
            EventAlert::ProposalRejected {
                item_name: "x".into()
            }
            .event_type(),
            "proposal_rejected"
        );
    }
}
