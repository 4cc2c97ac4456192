//! Repository layer.
//!
//! Each repository is a zero-sized struct. Read queries take `&PgPool`;
//! batch writes take `&mut PgConnection` so the writer can run them
//! inside its own transaction.

pub mod acoustic_repo;
pub mod daily_bucket_repo;
pub mod detection_repo;
pub mod monthly_bucket_repo;

pub use acoustic_repo::AcousticRepo;
pub use daily_bucket_repo::DailyBucketRepo;
pub use detection_repo::DetectionRepo;
pub use monthly_bucket_repo::MonthlyBucketRepo;

/// Build a multi-row `VALUES` clause body: `($1, $2), ($3, $4)`.
pub(crate) fn values_placeholders(rows: usize, columns: usize) -> String {
    let mut clause = String::with_capacity(rows * columns * 5);
    let mut param_idx = 1usize;
    for i in 0..rows {
        if i > 0 {
            clause.push_str(", ");
        }
        clause.push('(');
        for j in 0..columns {
            if j > 0 {
                clause.push_str(", ");
            }
            clause.push('$');
            clause.push_str(&param_idx.to_string());
            param_idx += 1;
        }
        clause.push(')');
    }
    clause
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_number_sequentially() {
        assert_eq!(values_placeholders(2, 3), "($1, $2, $3), ($4, $5, $6)");
        assert_eq!(values_placeholders(1, 1), "($1)");
        assert_eq!(values_placeholders(0, 4), "");
    }
}
