//! Synthetic datasets shared by the integration tests.
#![allow(dead_code)]
use ndarray::Array2;
use rand::prelude::*;

use kernelboost::prelude::*;
use kernelboost::common::utils::replicate_border;


pub const ROWS: usize = 12;
pub const COLS: usize = 12;
pub const SAMPLE_SIZE: usize = 3;
pub const BORDER: usize = 1;


/// The ground truth of image `k`:
/// `+1` on the left half for even `k`, on the right half otherwise.
pub fn ground_truth(k: usize) -> Array2<i32> {
    Array2::from_shape_fn((ROWS, COLS), |(_, c)| {
        let left = c < COLS / 2;
        if left == (k % 2 == 0) { 1 } else { -1 }
    })
}


/// A channel that is slightly brighter where the ground truth is positive,
/// buried in uniform noise so that the classes overlap.
pub fn channel<R: Rng>(gt: &Array2<i32>, rng: &mut R) -> Array2<f64> {
    let raw = gt.mapv(|v| {
        let base = if v > 0 { 0.55 } else { 0.45 };
        base + rng.gen_range(-0.4..0.4)
    });
    replicate_border(raw.view(), BORDER)
}


/// A labeled dataset of `n_images` images with one channel
/// and the gt values `-1`, `+1`.
pub fn dataset(n_images: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = DatasetBuilder::new(SAMPLE_SIZE, BORDER)
        .channel_names(["green"])
        .gt_values([-1, 1]);
    for k in 0..n_images {
        let gt = ground_truth(k);
        let ch = channel(&gt, &mut rng);
        let mask = Array2::from_elem((ROWS, COLS), 255u8);
        let record = ImageRecord::new(format!("img{k}.png"), vec![ch], mask)
            .ground_truth(gt)
            .feedback(k == 0);
        builder.push(record);
    }
    builder.build().unwrap()
}


/// A labeled dataset with the gt values `0`, `1` and `2`,
/// one third of the columns each.
pub fn three_class_dataset(n_images: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = DatasetBuilder::new(SAMPLE_SIZE, BORDER)
        .channel_names(["green"]);
    for k in 0..n_images {
        let gt = Array2::from_shape_fn((ROWS, COLS), |(_, c)| {
            (c / (COLS / 3)) as i32
        });
        let raw = gt.mapv(|v| 0.3 + v as f64 * 0.15 + rng.gen_range(-0.3..0.3));
        let ch = replicate_border(raw.view(), BORDER);
        let mask = Array2::from_elem((ROWS, COLS), 255u8);
        let record = ImageRecord::new(format!("img{k}.png"), vec![ch], mask)
            .ground_truth(gt);
        builder.push(record);
    }
    builder.build().unwrap()
}


/// The same images without ground truth.
pub fn inference_dataset(n_images: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = DatasetBuilder::new(SAMPLE_SIZE, BORDER)
        .channel_names(["green"]);
    for k in 0..n_images {
        let ch = channel(&ground_truth(k), &mut rng);
        let mask = Array2::from_elem((ROWS, COLS), 255u8);
        builder.push(ImageRecord::new(format!("img{k}.png"), vec![ch], mask));
    }
    builder.build().unwrap()
}


/// Small training parameters matching [`dataset`].
pub fn parameters() -> Parameters {
    kernelboost::logging::init();
    Parameters::default()
        .channel_list(["green"])
        .gt_values([-1, 1])
        .sample_size(SAMPLE_SIZE)
        .border_size(BORDER)
        .filter_size(3)
        .filters_no(4)
        .smoothing_lambda(0.1)
        .tree_depth(2)
        .final_tree_depth(2)
        .samples_no(40, 40)
        .final_samples_no(40)
        .rounds(3)
        .final_rounds(2)
        .shrinkage_factor(0.5)
        .seed(7)
}
