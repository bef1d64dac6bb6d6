//! HTTP request handlers

pub mod alert;
pub mod auth;
pub mod bid;
pub mod dashboard;
pub mod diary;
pub mod health;
pub mod order;
pub mod proposal;
pub mod review;
pub mod stock;
pub mod user;

pub use alert::{generate_alert, list_alerts, mark_alert_read, mark_all_alerts_read};
pub use auth::{login, logout, me, refresh, register, request_otp, verify_otp};
pub use bid::{close_bid, create_bid, delete_bid, get_bid, list_bids};
pub use dashboard::get_dashboard;
pub use diary::{
    create_diary_entry, delete_diary_entry, get_diary_entry, list_diary_entries,
    update_diary_entry,
};
pub use health::health_check;
pub use order::{
    attach_order_images, export_orders, get_order, list_orders, receive_order, ship_order,
};
pub use proposal::{
    accept_proposal, counter_proposal, get_proposal, list_bid_proposals, list_my_proposals,
    reject_proposal, submit_proposal,
};
pub use review::create_review;
pub use stock::{
    create_stock_item, delete_stock_item, get_stock_item, list_stock, update_stock_item,
};
pub use user::{
    decide_compliance, discover_suppliers, get_profile, list_user_reviews, submit_compliance,
    update_profile,
};
