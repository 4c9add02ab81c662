use chrono::{DateTime, Datelike, Utc};

/// Human-facing order number: zero-padded sequence, then month and year of
/// opening (`000042/032026`).
///
/// The sequence comes from a dedicated counter, never from the last stored
/// order.
pub fn format_order_number(sequence: u64, opened_at: DateTime<Utc>) -> String {
    format!(
        "{:06}/{:02}{:04}",
        sequence,
        opened_at.month(),
        opened_at.year()
    )
}
