use super::FileRecord;
use crate::common::*;

/// Splits records into train, validation and test sets by patient.
///
/// Patients with any abnormal study only go to validation or test, so the
/// training set is purely normal. Normal-only patients are divided by the
/// configured fractions and abnormal patients are divided between
/// validation and test in the ratio of the two fractions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainValTestSplitter {
    pub val_fraction: R64,
    pub test_fraction: R64,
    pub seed: u64,
}

impl Default for TrainValTestSplitter {
    fn default() -> Self {
        Self {
            val_fraction: r64(0.1),
            test_fraction: r64(0.1),
            seed: 42,
        }
    }
}

/// The outcome of [TrainValTestSplitter::split].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSplit {
    pub train: Vec<FileRecord>,
    pub validation: Vec<FileRecord>,
    pub test: Vec<FileRecord>,
}

impl TrainValTestSplitter {
    pub fn validate(&self) -> Result<()> {
        let Self {
            val_fraction,
            test_fraction,
            ..
        } = *self;
        ensure!(
            val_fraction > 0.0 && test_fraction > 0.0,
            "val_fraction and test_fraction must be positive"
        );
        ensure!(
            val_fraction + test_fraction < 1.0,
            "val_fraction + test_fraction must be less than 1, but get {}",
            val_fraction + test_fraction
        );
        Ok(())
    }

    pub fn split(&self, records: impl IntoIterator<Item = FileRecord>) -> Result<DatasetSplit> {
        self.validate()?;
        let Self {
            val_fraction,
            test_fraction,
            seed,
        } = *self;

        let patients: BTreeMap<String, Vec<FileRecord>> = records
            .into_iter()
            .map(|record| (record.patient.clone(), record))
            .into_group_map()
            .into_iter()
            .collect();

        let (mut abnormal, mut normal): (Vec<_>, Vec<_>) = patients
            .into_iter()
            .partition(|(_, records)| records.iter().any(|record| record.abnormal));

        let mut rng = StdRng::seed_from_u64(seed);
        normal.shuffle(&mut rng);
        abnormal.shuffle(&mut rng);

        let num_normal = normal.len() as f64;
        let num_normal_val = (num_normal * val_fraction.raw()).round() as usize;
        let num_normal_test = (num_normal * test_fraction.raw()).round() as usize;
        ensure!(
            num_normal_val + num_normal_test < normal.len(),
            "too few normal patients ({}) to split",
            normal.len()
        );

        let val_ratio = val_fraction / (val_fraction + test_fraction);
        let num_abnormal_val = (abnormal.len() as f64 * val_ratio.raw()).round() as usize;

        let mut normal = normal.into_iter();
        let mut abnormal = abnormal.into_iter();

        let flatten = |patients: Vec<(String, Vec<FileRecord>)>| -> Vec<FileRecord> {
            let mut records: Vec<_> = patients
                .into_iter()
                .flat_map(|(_, records)| records)
                .collect();
            records.sort();
            records
        };

        let validation = flatten(
            normal
                .by_ref()
                .take(num_normal_val)
                .chain(abnormal.by_ref().take(num_abnormal_val))
                .collect(),
        );
        let test = flatten(
            normal
                .by_ref()
                .take(num_normal_test)
                .chain(abnormal)
                .collect(),
        );
        let train = flatten(normal.collect());

        info!(
            "split {} train, {} validation and {} test images",
            train.len(),
            validation.len(),
            test.len()
        );

        Ok(DatasetSplit {
            train,
            validation,
            test,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_records() -> Vec<FileRecord> {
        (0..40)
            .flat_map(|patient| {
                let abnormal_patient = patient % 4 == 0;
                (0..2).map(move |study| FileRecord {
                    path: PathBuf::from(format!("patient{:05}/study{}/image1.png", patient, study)),
                    patient: format!("patient{:05}", patient),
                    study: format!("study{}", study),
                    abnormal: abnormal_patient && study == 0,
                })
            })
            .collect()
    }

    #[test]
    fn patient_disjoint_split() -> Result<()> {
        let splitter = TrainValTestSplitter {
            val_fraction: r64(0.2),
            test_fraction: r64(0.2),
            seed: 3,
        };
        let DatasetSplit {
            train,
            validation,
            test,
        } = splitter.split(make_records())?;

        assert_eq!(train.len() + validation.len() + test.len(), 80);
        assert!(train.iter().all(|record| !record.abnormal));
        assert!(validation.iter().any(|record| record.abnormal));
        assert!(test.iter().any(|record| record.abnormal));

        let patients = |records: &[FileRecord]| -> HashSet<String> {
            records.iter().map(|record| record.patient.clone()).collect()
        };
        let train_patients = patients(&train);
        let val_patients = patients(&validation);
        let test_patients = patients(&test);
        assert!(train_patients.is_disjoint(&val_patients));
        assert!(train_patients.is_disjoint(&test_patients));
        assert!(val_patients.is_disjoint(&test_patients));

        // 30 normal patients: 6 validation, 6 test, 18 train
        assert_eq!(train_patients.len(), 18);
        // 10 abnormal patients are halved
        assert_eq!(val_patients.len(), 6 + 5);
        assert_eq!(test_patients.len(), 6 + 5);
        Ok(())
    }

    #[test]
    fn split_is_deterministic() -> Result<()> {
        let splitter = TrainValTestSplitter::default();
        let lhs = splitter.split(make_records())?;
        let rhs = splitter.split(make_records())?;
        assert_eq!(lhs, rhs);
        Ok(())
    }

    #[test]
    fn invalid_fractions() {
        let splitter = TrainValTestSplitter {
            val_fraction: r64(0.6),
            test_fraction: r64(0.5),
            seed: 0,
        };
        assert!(splitter.split(make_records()).is_err());
    }
}
