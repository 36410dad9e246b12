//! # msa-routing
//!
//! Online Multiple-Scenario decision engine for dynamic routing: a pool of
//! complete speculative plans is kept improved and consistent with reality
//! while requests arrive, irrevocable next-visit decisions are enforced in
//! every plan, and one recommended action per resource is synthesized from
//! the pool at each decision point.
//!
//! ## Modules
//!
//! - [`models`] — Nodes, resources and the static problem instance
//! - [`distance`] — Distance and travel time matrix
//! - [`plan`] — Giant-tour plan representation with frozen nodes, and [`plan::Scenario`]
//! - [`evaluation`] — Full constraint audit of a plan
//! - [`world`] — What actually happened: released requests, commitments, service
//! - [`pool`] — The scenario pool and its eviction policies
//! - [`components`] — Pluggable strategy roles
//! - [`strategies`] — Reference strategy implementations (nearest neighbour, ALNS, insertion, consensus)
//! - [`manager`] — The orchestrator ([`manager::ComponentManager`])
//! - [`events`] — Engine events and their priority queue
//! - [`engine`] — The decision/event loop ([`engine::Engine`])
//! - [`monitor`] — Tracing span and monitor event channel
//! - [`config`] — Engine configuration
//! - [`error`] — Errors surfaced to callers

pub mod components;
pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod manager;
pub mod models;
pub mod monitor;
pub mod plan;
pub mod pool;
pub mod strategies;
pub mod world;
