use super::*;
use crate::{common::*, profiling::Timing};

/// List the files matching `*.jpg` under `image_dir` recursively.
///
/// The match is case-sensitive. Files and directories below `image_dir`
/// whose names start with `.` or `_` are hidden and skipped, such as
/// `._043_0001.jpg` sidecars. The returned paths are sorted.
pub async fn list_image_files(image_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let image_dir = image_dir.as_ref().to_owned();

    tokio::task::spawn_blocking(move || -> Result<_> {
        fs::metadata(&image_dir).with_context(|| {
            format!("unable to access image directory '{}'", image_dir.display())
        })?;

        let dir_str = image_dir
            .to_str()
            .ok_or_else(|| format_err!("non-UTF-8 path '{}'", image_dir.display()))?;
        let pattern = format!(
            "{}/**/*.jpg",
            glob::Pattern::escape(dir_str.trim_end_matches('/'))
        );

        let options = glob::MatchOptions {
            require_literal_leading_dot: true,
            ..Default::default()
        };

        let mut image_files: Vec<_> = glob::glob_with(&pattern, options)?
            .map(|result| -> Result<_> {
                let path = result?;
                // skip directories named like *.jpg and hidden entries
                let is_image = path.is_file() && !is_hidden(&image_dir, &path);
                Ok(is_image.then(|| path))
            })
            .filter_map(|result| result.transpose())
            .try_collect()?;
        image_files.sort();

        Ok(image_files)
    })
    .await?
}

fn is_hidden(image_dir: &Path, path: &Path) -> bool {
    let relative = match path.strip_prefix(image_dir) {
        Ok(relative) => relative,
        Err(_) => return false,
    };
    relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .map_or(false, |name| name.starts_with('.') || name.starts_with('_'))
    })
}

/// Load all image files under `image_dir`, then decode, normalize and label
/// them in parallel.
///
/// The first failing file aborts the assembly.
pub async fn assemble_dataset(
    image_dir: impl AsRef<Path>,
    image_size: u32,
    num_partitions: usize,
) -> Result<CachedDataset> {
    let image_dir = image_dir.as_ref();
    ensure!(image_size > 0, "image_size must be positive");
    ensure!(num_partitions > 0, "num_partitions must be positive");

    let mut timing = Timing::new("assemble_dataset");

    // list image files
    let image_files = list_image_files(image_dir).await?;
    let num_files = image_files.len();
    timing.set_record("list_image_files");
    if num_files == 0 {
        warn!("no image files found in '{}'", image_dir.display());
    } else {
        info!(
            "found {} image files in '{}'",
            num_files,
            image_dir.display()
        );
    }

    // load and transform images
    let records: Vec<(RawRecord, LabeledRecord)> = stream::iter(image_files)
        .par_map(num_partitions, move |image_file| {
            move || -> Result<_> {
                let raw = RawRecord::open(&image_file)?;
                let labeled = raw.to_labeled(image_size)?;
                Ok((raw, labeled))
            }
        })
        .enumerate()
        .map(move |(index, result)| {
            let count = index + 1;
            if count % 1000 == 0 || count == num_files {
                info!("processed {}/{} images", count, num_files);
            }
            result
        })
        .try_collect()
        .await?;

    {
        let num_bytes: usize = records.iter().map(|(raw, _)| raw.content.len()).sum();
        timing.set_volume_record("transform", records.len(), num_bytes);
    }

    let (raw, labeled): (Vec<_>, Vec<_>) = records.into_iter().unzip();
    let dataset = CachedDataset::new(raw, labeled)?;
    debug!(
        "cached {} records in {} bytes",
        dataset.num_records(),
        dataset.cached_bytes()
    );

    timing.report();

    Ok(dataset)
}
