// Module layout (Clean Architecture style)
// - bootstrap: configuration and dependency wiring
// - infrastructure: Postgres and local filesystem adapters
// - presentation: HTTP handlers, routing and error responses
// - application: ports, use cases and request validation
// - domain: file records and storage path rules

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
