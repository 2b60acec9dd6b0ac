//! Arrow encoding of dataset records.

use crate::{
    common::*,
    dataset::{LabeledRecord, RawRecord},
};

lazy_static! {
    static ref RAW_SCHEMA: SchemaRef = Arc::new(Schema::new(vec![
        Field::new("path", DataType::Utf8, false),
        Field::new("content", DataType::Binary, false),
    ]));
    static ref LABELED_SCHEMA: SchemaRef = Arc::new(Schema::new(vec![
        Field::new("label", DataType::Int32, false),
        Field::new("image", DataType::Binary, false),
    ]));
}

/// Records that can be stored in a columnar file.
pub trait Columnar
where
    Self: Sized + Sync + Send,
{
    /// The Arrow schema of the record type.
    fn schema() -> SchemaRef;

    /// Estimated number of payload bytes of the record.
    fn row_size(&self) -> usize;

    fn to_record_batch<R>(records: &[R]) -> Result<RecordBatch>
    where
        R: Borrow<Self>;

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

impl Columnar for RawRecord {
    fn schema() -> SchemaRef {
        RAW_SCHEMA.clone()
    }

    fn row_size(&self) -> usize {
        self.path.len() + self.content.len()
    }

    fn to_record_batch<R>(records: &[R]) -> Result<RecordBatch>
    where
        R: Borrow<Self>,
    {
        let paths = StringArray::from_iter_values(records.iter().map(|r| r.borrow().path.as_str()));
        let contents =
            BinaryArray::from_iter_values(records.iter().map(|r| r.borrow().content.as_slice()));
        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![Arc::new(paths) as ArrayRef, Arc::new(contents) as ArrayRef],
        )?;
        Ok(batch)
    }

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let paths: &StringArray = column(batch, "path")?;
        let contents: &BinaryArray = column(batch, "content")?;

        let records = paths
            .iter()
            .zip(contents.iter())
            .map(|(path, content)| -> Result<_> {
                let path = path.ok_or_else(|| format_err!("null value in column 'path'"))?;
                let content =
                    content.ok_or_else(|| format_err!("null value in column 'content'"))?;
                Ok(RawRecord {
                    path: path.to_owned(),
                    content: content.to_vec(),
                })
            })
            .try_collect()?;
        Ok(records)
    }
}

impl Columnar for LabeledRecord {
    fn schema() -> SchemaRef {
        LABELED_SCHEMA.clone()
    }

    fn row_size(&self) -> usize {
        mem::size_of::<i32>() + self.image.len()
    }

    fn to_record_batch<R>(records: &[R]) -> Result<RecordBatch>
    where
        R: Borrow<Self>,
    {
        let labels = Int32Array::from_iter_values(records.iter().map(|r| r.borrow().label));
        let images =
            BinaryArray::from_iter_values(records.iter().map(|r| r.borrow().image.as_slice()));
        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![Arc::new(labels) as ArrayRef, Arc::new(images) as ArrayRef],
        )?;
        Ok(batch)
    }

    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let labels: &Int32Array = column(batch, "label")?;
        let images: &BinaryArray = column(batch, "image")?;

        let records = labels
            .iter()
            .zip(images.iter())
            .map(|(label, image)| -> Result<_> {
                let label = label.ok_or_else(|| format_err!("null value in column 'label'"))?;
                let image = image.ok_or_else(|| format_err!("null value in column 'image'"))?;
                Ok(LabeledRecord {
                    label,
                    image: image.to_vec(),
                })
            })
            .try_collect()?;
        Ok(records)
    }
}

fn column<'a, A>(batch: &'a RecordBatch, name: &str) -> Result<&'a A>
where
    A: Array + 'static,
{
    let array = batch
        .column_by_name(name)
        .ok_or_else(|| format_err!("column '{}' not found", name))?;
    let array = array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| format_err!("column '{}' has unexpected type {}", name, array.data_type()))?;
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_record_batch_test() -> Result<()> {
        let records = vec![
            LabeledRecord {
                label: 43,
                image: vec![1; 27],
            },
            LabeledRecord {
                label: 255,
                image: vec![2; 27],
            },
        ];
        let refs: Vec<&LabeledRecord> = records.iter().collect();

        let batch = LabeledRecord::to_record_batch(&refs)?;
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema(), LabeledRecord::schema());
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Int32);
        assert_eq!(LabeledRecord::from_record_batch(&batch)?, records);
        assert_eq!(records[0].row_size(), 31);
        Ok(())
    }

    #[test]
    fn raw_record_batch_test() -> Result<()> {
        let records = vec![RawRecord {
            path: "/data/043.coin/043_0001.jpg".into(),
            content: vec![0xff, 0xd8, 0xff],
        }];

        let batch = RawRecord::to_record_batch(&records)?;
        assert_eq!(batch.schema().field(0).name(), "path");
        assert_eq!(batch.schema().field(1).name(), "content");
        assert_eq!(RawRecord::from_record_batch(&batch)?, records);

        // schema mismatch
        assert!(LabeledRecord::from_record_batch(&batch).is_err());
        Ok(())
    }
}
