// Corpus discovery and splitting
// Recursively locates audio files and slices the shuffled list into
// deterministic train/val/test subsets

use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::config::{DatasetError, Subset};

/// Number of copies a dry run serves of its single file
const DRY_RUN_COPIES: usize = 50;

/// Recursively collect all `*.wav` files under `audio_dir`, sorted by path so
/// the subsequent seeded shuffle is reproducible across filesystems.
pub fn discover_audio_files(audio_dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut files: Vec<PathBuf> = WalkDir::new(audio_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(DatasetError::Config(format!(
            "No .wav files found under {}",
            audio_dir.display()
        )));
    }

    Ok(files)
}

/// Shuffle the corpus with `split_seed` and slice out the requested subset.
///
/// The split is 80/10/10 train/val/test by index over the shuffled list;
/// `full-train`/`full-val` use the entire list. `fraction` truncates the
/// selection, and `dry_run` replaces it with one file repeated.
pub fn select_subset(
    mut files: Vec<PathBuf>,
    subset: Subset,
    split_seed: u64,
    fraction: f64,
    dry_run: bool,
) -> Vec<PathBuf> {
    let mut rng = StdRng::seed_from_u64(split_seed);
    files.shuffle(&mut rng);

    if dry_run {
        let selected = match files.first().cloned() {
            Some(first) => vec![first; DRY_RUN_COPIES],
            None => Vec::new(),
        };
        info!("Selected 1 file for dry run");
        return selected;
    }

    let n = files.len();
    let (start, stop) = match subset {
        Subset::Train => (0, (n as f64 * 0.8) as usize),
        Subset::Val => ((n as f64 * 0.8) as usize, (n as f64 * 0.9) as usize),
        Subset::Test => ((n as f64 * 0.9) as usize, n),
        Subset::FullTrain | Subset::FullVal => (0, n),
    };

    let mut selected = files[start..stop].to_vec();
    let keep = ((selected.len() as f64 * fraction).ceil() as usize).min(selected.len());
    selected.truncate(keep);

    info!(
        "Selected {} files for {} subset",
        selected.len(),
        subset.as_str()
    );
    selected
}
