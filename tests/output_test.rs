mod utils;

#[cfg(test)]
mod tests {
    use super::utils::{PNEUMONIA, demographics_batch, infection_phenotypes};
    use cohort_extract::output::{DelimitedFormat, write_delimited};
    use cohort_extract::{
        ConditionOccurrence, Person, SexAtBirth, aggregate_phenotypes, merge_covariates,
    };
    use std::fs;

    #[test]
    fn test_covariates_csv() {
        let persons = vec![
            Person::new(1, Some(40), SexAtBirth::Male),
            Person::new(2, None, SexAtBirth::Female),
        ];
        let rows = vec![
            ConditionOccurrence::new(1, PNEUMONIA, Some(38)),
            ConditionOccurrence::new(1, PNEUMONIA, Some(35)),
        ];
        let table = merge_covariates(&persons, &aggregate_phenotypes(&rows, &infection_phenotypes()));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covariates.csv");
        write_delimited(&table.to_record_batch().unwrap(), &path, DelimitedFormat::CSV).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "PERSON_ID,AGE,SEX_AT_BIRTH,ACUTE_INFLUENZA,ACUTE_PANCREATITIS,PNEUMONIA",
                "1,35,1,false,false,true",
                "2,,0,false,false,false",
            ]
        );
    }

    #[test]
    fn test_existing_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covariates.csv");
        fs::write(&path, "stale content\nfrom a previous run\nwith more lines\n").unwrap();

        let table = merge_covariates(
            &[Person::new(5, Some(20), SexAtBirth::Female)],
            &aggregate_phenotypes(&[], &infection_phenotypes()),
        );
        write_delimited(&table.to_record_batch().unwrap(), &path, DelimitedFormat::CSV).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("stale"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_tsv_with_index_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covariates.tsv");
        write_delimited(&demographics_batch(), &path, DelimitedFormat::TSV_WITH_INDEX).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "\tperson_id\tT_DISP_gender\tT_DISP_race",
                "0\t11\tWoman\tAsian",
                "1\t12\t\tWhite",
            ]
        );
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covariates.csv");
        fs::write(&path, "previous run\n").unwrap();
        // A directory in the staging location makes the write fail
        fs::create_dir(dir.path().join("covariates.csv.tmp")).unwrap();

        let result = write_delimited(&demographics_batch(), &path, DelimitedFormat::CSV);

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous run\n");
    }

    #[test]
    fn test_no_staging_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covariates.tsv");
        write_delimited(&demographics_batch(), &path, DelimitedFormat::TSV_WITH_INDEX).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["covariates.tsv".to_string()]);
    }
}
