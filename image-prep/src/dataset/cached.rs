use super::*;
use crate::common::*;

/// The in-memory materialized dataset.
///
/// Raw and labeled records at the same index originate from the same file.
/// Clones share the underlying buffers.
#[derive(Debug, Clone)]
pub struct CachedDataset {
    raw: Arc<[RawRecord]>,
    labeled: Arc<[LabeledRecord]>,
}

impl CachedDataset {
    pub fn new(raw: Vec<RawRecord>, labeled: Vec<LabeledRecord>) -> Result<Self> {
        ensure!(
            raw.len() == labeled.len(),
            "the number of raw records ({}) and labeled records ({}) must agree",
            raw.len(),
            labeled.len()
        );

        Ok(Self {
            raw: raw.into(),
            labeled: labeled.into(),
        })
    }

    pub fn num_records(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw_records(&self) -> &[RawRecord] {
        &self.raw
    }

    pub fn labeled_records(&self) -> &[LabeledRecord] {
        &self.labeled
    }

    /// Iterate over the source paths paired with labeled records.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabeledRecord)> {
        self.raw
            .iter()
            .zip(self.labeled.iter())
            .map(|(raw, labeled)| (raw.path.as_str(), labeled))
    }

    /// The total size of cached buffers in bytes.
    pub fn cached_bytes(&self) -> usize {
        let raw_bytes: usize = self
            .raw
            .iter()
            .map(|record| record.path.len() + record.content.len())
            .sum();
        let labeled_bytes: usize = self
            .labeled
            .iter()
            .map(|record| mem::size_of::<i32>() + record.image.len())
            .sum();
        raw_bytes + labeled_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_dataset_test() -> Result<()> {
        let raw = vec![
            RawRecord {
                path: "/data/001.a/1.jpg".into(),
                content: vec![1, 2, 3],
            },
            RawRecord {
                path: "/data/002.b/2.jpg".into(),
                content: vec![4, 5],
            },
        ];
        let labeled = vec![
            LabeledRecord {
                label: 1,
                image: vec![0; 12],
            },
            LabeledRecord {
                label: 2,
                image: vec![0; 12],
            },
        ];

        let dataset = CachedDataset::new(raw, labeled)?;
        let cloned = dataset.clone();
        assert!(Arc::ptr_eq(&dataset.labeled, &cloned.labeled));
        assert_eq!(dataset.num_records(), 2);

        let pairs: Vec<_> = dataset
            .iter()
            .map(|(path, record)| (path, record.label))
            .collect();
        assert_eq!(pairs, vec![("/data/001.a/1.jpg", 1), ("/data/002.b/2.jpg", 2)]);
        assert_eq!(dataset.cached_bytes(), (17 + 3) + (17 + 2) + 2 * (4 + 12));

        assert!(CachedDataset::new(vec![], vec![LabeledRecord {
            label: 0,
            image: vec![]
        }])
        .is_err());
        Ok(())
    }
}
