/// Initialize logging (reads RUST_LOG env var). Safe to call more than once;
/// later calls are no-ops, which keeps it usable from tests.
pub fn init() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
