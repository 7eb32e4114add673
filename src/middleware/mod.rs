/// Middleware do servidor HTTP
///
/// - Proteção contra panics no processamento dos webhooks

pub mod panic_handler;

pub use panic_handler::panic_protection;
