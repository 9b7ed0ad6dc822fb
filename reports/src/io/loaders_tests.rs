#[cfg(test)]
mod tests {
    use crate::io::loaders::{
        dataframe_to_context, load_context, load_predictions, load_scenario_metadata, load_selections,
        TableFormat,
    };
    use chrono::NaiveDate;
    use polars::prelude::*;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Helper to create a temp file with the given suffix and content
    fn create_temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_table_format_detection() {
        assert_eq!(TableFormat::from_path(Path::new("a.csv")).unwrap(), TableFormat::Csv);
        assert_eq!(TableFormat::from_path(Path::new("a.PARQUET")).unwrap(), TableFormat::Parquet);
        assert!(TableFormat::from_path(Path::new("a.json")).is_err());
        assert!(TableFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_load_predictions_casts_keys_and_probabilities() {
        // Integer keys and an integer probability must still load.
        let file = create_temp_file(
            ".csv",
            "_decision,_choice,probability\n1,10,0.25\n1,20,0.75\n2,10,1\n",
        );

        let rows = load_predictions(file.path()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].decision, "1");
        assert_eq!(rows[1].choice, "20");
        assert_eq!(rows[2].probability, 1.0);
    }

    #[test]
    fn test_load_selections() {
        let file = create_temp_file(".csv", "_decision,_choice\na,x\nb,y\n");

        let rows = load_selections(file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].decision, "b");
        assert_eq!(rows[1].choice, "y");
    }

    #[test]
    fn test_load_context_from_csv() {
        let file = create_temp_file(
            ".csv",
            "_decision,_choice,datetime,h3_index,depth_bin\n\
             1,10,2024-01-01 06:00:00,862830827ffffff,10\n\
             1,20,2024-01-01T06:00:00,862830827ffffff,20.5\n",
        );

        let rows = load_context(file.path()).unwrap();

        let expected = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(6, 0, 0).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, expected);
        assert_eq!(rows[1].timestamp, expected);
        assert_eq!(rows[1].depth_bin, 20.5);
        assert_eq!(rows[0].h3_index, "862830827ffffff");
    }

    #[test]
    fn test_context_from_datetime_column() {
        let a = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let b = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap().and_hms_opt(13, 0, 0).unwrap();
        let df = df!(
            "_decision" => ["d1", "d2"],
            "_choice" => ["10", "10"],
            "datetime" => &[a, b],
            "h3_index" => ["k", "k"],
            "depth_bin" => [10.0, 10.0]
        )
        .unwrap();

        let rows = dataframe_to_context(&df).unwrap();

        assert_eq!(rows[0].timestamp, a);
        assert_eq!(rows[1].timestamp, b);
    }

    #[test]
    fn test_load_context_from_parquet() {
        let a = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap().and_hms_opt(5, 0, 0).unwrap();
        let mut df = df!(
            "_decision" => ["d1"],
            "_choice" => ["10"],
            "datetime" => &[a],
            "h3_index" => ["k"],
            "depth_bin" => [10.0]
        )
        .unwrap();
        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        ParquetWriter::new(std::fs::File::create(file.path()).unwrap())
            .finish(&mut df)
            .unwrap();

        let rows = load_context(file.path()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, a);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let file = create_temp_file(".csv", "_decision,probability\n1,0.5\n");

        let err = load_predictions(file.path()).unwrap_err();

        assert!(format!("{:#}", err).contains("_choice"));
    }

    #[test]
    fn test_unparsable_timestamp_is_reported() {
        let file = create_temp_file(
            ".csv",
            "_decision,_choice,datetime,h3_index,depth_bin\n1,10,not a date,k,10\n",
        );

        let err = load_context(file.path()).unwrap_err();

        assert!(format!("{:#}", err).contains("row 0"));
    }

    #[test]
    fn test_load_scenario_metadata() {
        let file = create_temp_file(
            ".json",
            r#"{
                "scenario_id": "s1",
                "name": "n",
                "species": "sp",
                "model": "m",
                "reference_model": "r",
                "region": "reg",
                "reference_region": "reg",
                "description": "d",
                "reference_time_window": ["2020-01-01 00:00:00", "2020-02-01 00:00:00"],
                "zoom": 5,
                "center": [-120.0, 45.0]
            }"#,
        );

        let meta = load_scenario_metadata(file.path()).unwrap();

        assert_eq!(meta.scenario_id, "s1");
        assert_eq!(meta.center, [-120.0, 45.0]);
    }

    #[test]
    fn test_load_scenario_metadata_missing_fields() {
        let file = create_temp_file(".json", r#"{"scenario_id": "s1"}"#);

        let err = load_scenario_metadata(file.path()).unwrap_err();

        assert!(err.to_string().contains("species"));
    }
}
