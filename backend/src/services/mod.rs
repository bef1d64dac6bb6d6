//! Business logic services for the TradeFlow marketplace

pub mod alert;
pub mod auth;
pub mod bid;
pub mod dashboard;
pub mod diary;
pub mod order;
pub mod proposal;
pub mod review;
pub mod stock;
pub mod user;

pub use alert::AlertService;
pub use auth::AuthService;
pub use bid::BidService;
pub use dashboard::DashboardService;
pub use diary::DiaryService;
pub use order::OrderService;
pub use proposal::ProposalService;
pub use review::ReviewService;
pub use stock::StockService;
pub use user::UserService;
