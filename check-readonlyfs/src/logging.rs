use env_logger::{Env, Target};

/// Logs go to stderr; stdout carries only the plugin result line.
/// Respects RUST_LOG if set, otherwise warnings only.
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .target(Target::Stderr)
        .init();
}
