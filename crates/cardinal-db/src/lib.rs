//! # cardinal-db: Persistence Layer for the Cardinal Pricing Engine
//!
//! This crate provides database access for the order pricing and tax
//! calculation engine. It uses SQLite for storage with sqlx for async
//! operations, and hosts the [`service::OrderPricingService`] that wires
//! the pure calculation in `cardinal-core` to persistence.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cardinal Pricing Data Flow                         │
//! │                                                                         │
//! │  Caller (order intake, admin tooling, tests)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    cardinal-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Service     │  │   │
//! │  │   │   (pool.rs)   │    │ (order.rs &c) │    │ (service.rs) │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │◄───│ snapshot ->  │  │   │
//! │  │   │ WAL, FKs on   │    │ AuditRepo     │    │ compute ->   │  │   │
//! │  │   │ Migrations    │    │ ProductRepo   │    │ commit       │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────┬───────┘  │   │
//! │  │                                                     │          │   │
//! │  └─────────────────────────────────────────────────────┼──────────┘   │
//! │                                                        ▼               │
//! │                                          cardinal-core (pure, no I/O)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, order, audit, etc.)
//! - [`service`] - The snapshot/compute/commit pricing orchestrator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cardinal_db::{Database, DbConfig, OrderPricingService, OrderRequestLine};
//!
//! let db = Database::new(DbConfig::new("path/to/cardinal.db")).await?;
//! let service = OrderPricingService::new(db);
//!
//! let priced = service
//!     .price_and_commit("cust-42", &[OrderRequestLine {
//!         product_id: "prod-7".to_string(),
//!         quantity: 10,
//!     }])
//!     .await?;
//!
//! let audits = service.audits_for_order(&priced.order_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::{OrderPricingService, OrderRequestLine, PricedOrder};

// Repository re-exports for convenience
pub use repository::audit::AuditRepository;
pub use repository::customer::CustomerRepository;
pub use repository::order::{Order, OrderLine, OrderLineFlatTax, OrderRepository};
pub use repository::price_memory::PriceMemoryRepository;
pub use repository::product::ProductRepository;
pub use repository::tax_rule::TaxRuleRepository;
