//! # Repository Module
//!
//! Database repository implementations for the pricing engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  OrderPricingService                                                   │
//! │       │                                                                 │
//! │       │  db.products().get_by_id("prod-1")                             │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, product)                                            │
//! │  └── set_flat_tax_links(&self, id, rule_ids)                           │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commit-path writes (orders, audits) take an open `SqliteConnection`
//! instead of the pool, so the service can compose them into one
//! transaction.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product rows plus flat-tax links
//! - [`customer::CustomerRepository`] - Customer rows
//! - [`tax_rule::TaxRuleRepository`] - Flat-tax rule configuration
//! - [`price_memory::PriceMemoryRepository`] - Append-only price history
//! - [`order::OrderRepository`] - Orders with frozen line breakdowns
//! - [`audit::AuditRepository`] - Write-once versioned audit records

pub mod audit;
pub mod customer;
pub mod order;
pub mod price_memory;
pub mod product;
pub mod tax_rule;
