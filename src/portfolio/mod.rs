mod buckets;
mod portfolio_model;
mod portfolio_service;


pub use portfolio_model::*;
pub use portfolio_service::PortfolioService;
