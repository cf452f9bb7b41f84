mod utils;

#[cfg(test)]
mod tests {
    use super::utils::{
        INFLUENZA, PANCREATITIS, PNEUMONIA, condition_batch, infection_phenotypes,
    };
    use cohort_extract::models::condition::condition_occurrences;
    use cohort_extract::{ConditionOccurrence, aggregate_phenotypes};

    fn occurrences() -> Vec<ConditionOccurrence> {
        vec![
            ConditionOccurrence::new(1, PNEUMONIA, Some(38)),
            ConditionOccurrence::new(1, PNEUMONIA, Some(35)),
            ConditionOccurrence::new(2, INFLUENZA, Some(60)),
            ConditionOccurrence::new(2, PANCREATITIS, Some(58)),
            ConditionOccurrence::new(3, INFLUENZA, None),
            ConditionOccurrence::new(4, PANCREATITIS, None),
            ConditionOccurrence::new(4, PANCREATITIS, Some(71)),
        ]
    }

    #[test]
    fn test_flags_are_or_over_rows() {
        let aggregate = aggregate_phenotypes(&occurrences(), &infection_phenotypes());

        assert_eq!(aggregate.len(), 4);
        assert_eq!(aggregate.get(1).unwrap().flags, vec![false, false, true]);
        assert_eq!(aggregate.get(2).unwrap().flags, vec![true, true, false]);
        assert_eq!(aggregate.get(3).unwrap().flags, vec![true, false, false]);
        assert_eq!(aggregate.get(4).unwrap().flags, vec![false, true, false]);
    }

    #[test]
    fn test_min_age_spans_all_phenotypes_and_skips_nulls() {
        let aggregate = aggregate_phenotypes(&occurrences(), &infection_phenotypes());

        assert_eq!(aggregate.get(1).unwrap().min_age_at_occurrence, Some(35));
        assert_eq!(aggregate.get(2).unwrap().min_age_at_occurrence, Some(58));
        assert_eq!(aggregate.get(3).unwrap().min_age_at_occurrence, None);
        assert_eq!(aggregate.get(4).unwrap().min_age_at_occurrence, Some(71));
    }

    #[test]
    fn test_persons_without_rows_are_absent() {
        let aggregate = aggregate_phenotypes(&occurrences(), &infection_phenotypes());

        assert!(aggregate.get(99).is_none());
        assert_eq!(aggregate.person_ids(), vec![1, 2, 3, 4]);

        let empty = aggregate_phenotypes(&[], &infection_phenotypes());
        assert!(empty.is_empty());
        assert_eq!(empty.phenotype_names().len(), 3);
    }

    #[test]
    fn test_result_is_independent_of_row_order() {
        let phenotypes = infection_phenotypes();
        let forward = occurrences();
        let expected = aggregate_phenotypes(&forward, &phenotypes);

        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(aggregate_phenotypes(&reversed, &phenotypes), expected);

        for shift in 1..forward.len() {
            let mut rotated = forward.clone();
            rotated.rotate_left(shift);
            assert_eq!(aggregate_phenotypes(&rotated, &phenotypes), expected);
        }
    }

    #[test]
    fn test_untracked_concept_counts_towards_age_only() {
        let rows = vec![
            ConditionOccurrence::new(7, 123, Some(20)),
            ConditionOccurrence::new(7, PNEUMONIA, Some(30)),
        ];
        let aggregate = aggregate_phenotypes(&rows, &infection_phenotypes());

        let summary = aggregate.get(7).unwrap();
        assert_eq!(summary.flags, vec![false, false, true]);
        assert_eq!(summary.min_age_at_occurrence, Some(20));
    }

    #[test]
    fn test_decoded_batch_aggregates() {
        let batch = condition_batch(&[
            (10, PNEUMONIA, Some(44)),
            (10, INFLUENZA, Some(41)),
            (11, PANCREATITIS, None),
        ]);

        let rows = condition_occurrences(&batch).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].visit_type.as_deref(), Some("Inpatient Visit"));

        let aggregate = aggregate_phenotypes(&rows, &infection_phenotypes());
        assert_eq!(aggregate.get(10).unwrap().flags, vec![true, false, true]);
        assert_eq!(aggregate.get(10).unwrap().min_age_at_occurrence, Some(41));
        assert_eq!(aggregate.get(11).unwrap().min_age_at_occurrence, None);
    }
}
