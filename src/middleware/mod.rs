pub mod auth_context;
