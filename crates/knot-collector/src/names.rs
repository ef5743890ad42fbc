//! Metric name normalisation.

/// Characters the server uses as separators in statistic names.
const SEPARATORS: [char; 5] = ['-', ' ', '.', '/', '+'];

/// Lowercase `name` and replace every separator with `_`.
///
/// No further validation is done; `query.total` becomes `query_total`.
pub fn sanitize_metric_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if SEPARATORS.contains(&c) { '_' } else { c })
        .collect()
}
