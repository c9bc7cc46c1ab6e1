use serde_json::Value;

use crate::process::diagnostics::Normalized;
use crate::process::extract::{extract_subtrees, TableSpec};
use crate::process::table::Table;
use crate::schema::{ColumnSchema, ColumnType, EpochUnit};

pub const PERSONAL_RECORDS: &str = "personal_records";
pub const STREAKS: &str = "streaks";
pub const ACHIEVEMENTS: &str = "achievements";
pub const WORKOUT_COUNTS: &str = "workout_counts";

/// The four tables cut from `/api/user/{id}/overview`.
pub fn overview_table_specs() -> Vec<TableSpec> {
    vec![
        TableSpec::new(PERSONAL_RECORDS, "personal_records[0].records")
            .with_columns(
                ColumnSchema::new()
                    .with("slug", ColumnType::Integer)
                    .with("value", ColumnType::Integer)
                    .with("raw_value", ColumnType::Float)
                    .with("workout_date", ColumnType::DateTimeIso),
            )
            .with_sort_by("slug"),
        TableSpec::new(STREAKS, "streaks").with_columns(
            ColumnSchema::new()
                .with(
                    "start_date_of_current_weekly",
                    ColumnType::DateTimeFromUnit(EpochUnit::Seconds),
                )
                .with(
                    "start_date_of_current_daily",
                    ColumnType::DateTimeFromUnit(EpochUnit::Seconds),
                ),
        ),
        TableSpec::new(ACHIEVEMENTS, "achievement_counts.achievements").with_flatten("template"),
        TableSpec::new(WORKOUT_COUNTS, "workout_counts.workouts"),
    ]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserOverview {
    pub personal_records: Table,
    pub streaks: Table,
    pub achievements: Table,
    pub workout_counts: Table,
}

impl UserOverview {
    /// Tables keyed by their output name, in a fixed order.
    pub fn tables(&self) -> [(&'static str, &Table); 4] {
        [
            (PERSONAL_RECORDS, &self.personal_records),
            (STREAKS, &self.streaks),
            (ACHIEVEMENTS, &self.achievements),
            (WORKOUT_COUNTS, &self.workout_counts),
        ]
    }
}

/// Reshape an overview payload into its four tables. Any table whose part of
/// the payload is missing or malformed comes back empty.
pub fn clean_user_overview(document: &Value) -> Normalized<UserOverview> {
    extract_subtrees(document, &overview_table_specs()).map(|mut tables| {
        let mut take = |name: &str| tables.remove(name).unwrap_or_default();
        UserOverview {
            personal_records: take(PERSONAL_RECORDS),
            streaks: take(STREAKS),
            achievements: take(ACHIEVEMENTS),
            workout_counts: take(WORKOUT_COUNTS),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::table::Cell;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    const SAMPLE: &str = include_str!("../../tests/data/user_overview.json");

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,pelotonscraper::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn sample() -> Value {
        serde_json::from_str(SAMPLE).expect("fixture should be valid JSON")
    }

    #[test]
    fn sample_payload_yields_four_tables() {
        init_test_logging();
        let doc = sample();
        let achievements_in_payload = doc["achievement_counts"]["achievements"]
            .as_array()
            .unwrap()
            .len();

        let result = clean_user_overview(&doc);

        assert!(result.is_clean(), "{:?}", result.diagnostics);
        let overview = result.output;
        assert_eq!(overview.workout_counts.num_rows(), 12);
        assert_eq!(overview.personal_records.num_rows(), 9);
        assert_eq!(overview.streaks.num_rows(), 1);
        assert_eq!(overview.achievements.num_rows(), achievements_in_payload);
    }

    #[test]
    fn personal_records_are_typed_and_sorted() {
        let overview = clean_user_overview(&sample()).output;
        let pr = &overview.personal_records;

        let slugs: Vec<i64> = pr
            .column("slug")
            .unwrap()
            .iter()
            .map(|c| c.as_i64().expect("slug should be an integer"))
            .collect();
        let mut sorted = slugs.clone();
        sorted.sort();
        assert_eq!(slugs, sorted);

        assert!(pr.column("value").unwrap().iter().all(|c| c.as_i64().is_some()));
        assert!(pr
            .column("raw_value")
            .unwrap()
            .iter()
            .all(|c| matches!(c, Cell::Float(_))));
        assert!(pr
            .column("workout_date")
            .unwrap()
            .iter()
            .all(|c| c.as_datetime().is_some()));
    }

    #[test]
    fn streak_dates_come_from_epoch_seconds() {
        let overview = clean_user_overview(&sample()).output;
        let weekly = overview.streaks.get(0, "start_date_of_current_weekly").unwrap();
        assert_eq!(
            weekly,
            &Cell::DateTime(Utc.with_ymd_and_hms(2024, 9, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn achievements_lose_their_template() {
        let overview = clean_user_overview(&sample()).output;
        let cols = overview.achievements.columns();
        assert!(!cols.iter().any(|c| c == "template"));
        assert!(cols.iter().any(|c| c == "name"));
        assert!(cols.iter().any(|c| c == "slug"));
    }

    #[test]
    fn garbage_payload_gives_four_empty_tables() {
        let result = clean_user_overview(&json!({"unexpected": true}));
        assert_eq!(result.output, UserOverview::default());
        assert_eq!(result.diagnostics.len(), 4);
        for (_, table) in result.output.tables() {
            assert!(table.is_empty());
        }
    }

    #[test]
    fn renamed_field_only_empties_its_table() {
        let mut doc = sample();
        let streaks = doc["streaks"].take();
        doc["streak_info"] = streaks;

        let result = clean_user_overview(&doc);

        assert!(result.output.streaks.is_empty());
        assert_eq!(result.output.workout_counts.num_rows(), 12);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].table.as_deref(), Some(STREAKS));
    }
}
