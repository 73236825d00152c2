use env_logger::Builder;

const DEFAULT_FILTER: &str = "info";

/// Filter directives from `SAMPLER_LOG`, else `RUST_LOG`, else `info`.
fn filter_spec(sampler: Option<String>, rust: Option<String>) -> String {
    sampler
        .or(rust)
        .filter(|spec| !spec.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_owned())
}

/// Initialize stderr logging. Both variables accept full env_logger
/// directives such as `info,mcp320x=trace`.
pub fn init() {
    let spec = filter_spec(
        std::env::var("SAMPLER_LOG").ok(),
        std::env::var("RUST_LOG").ok(),
    );

    Builder::new()
        .parse_filters(&spec)
        .format_timestamp_millis()
        .format_target(true)
        .init();
}
