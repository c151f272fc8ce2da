use rand::prelude::*;
use kernelboost::prelude::*;

mod common;
use common::*;


/// Tests for the sampling layer of `Dataset`.
#[cfg(test)]
pub mod sampling_tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sample_positions_respect_class() {
        let dataset = dataset(2, 1);
        let mut rng = StdRng::seed_from_u64(0);

        for (class, raw) in [(GtClass::Pos, 1), (GtClass::Neg, -1)] {
            let mut positions = SampleSet::new();
            let n = dataset.sample_positions(class, 0, 50, &mut positions, &mut rng)
                .unwrap();
            assert_eq!(50, n);
            assert_eq!(n, positions.len());

            for p in &positions {
                assert_eq!(class, dataset.gt(0, p.image)[[p.row, p.col]]);
                assert_eq!(raw, dataset.original_gt(p.image)[[p.row, p.col]]);
                assert!(dataset.is_valid_position(p.image, p.row, p.col));
            }
            let distinct = positions.iter().collect::<HashSet<_>>();
            assert_eq!(n, distinct.len(), "positions must be distinct.");
        }
    }


    #[test]
    fn sample_positions_return_all_when_short() {
        let dataset = dataset(2, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let mut positions = SampleSet::new();
        let n = dataset.sample_positions(
                GtClass::Pos, 0, 10_000, &mut positions, &mut rng
            )
            .unwrap();
        // Half of the pixels of each image are positive.
        assert_eq!(2 * ROWS * COLS / 2, n);
    }


    #[test]
    fn sample_positions_reject_ignore() {
        let dataset = dataset(2, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let before = vec![SamplePosition::new(1, 2, 3)];
        let mut positions = before.clone();

        let res = dataset.sample_positions(
            GtClass::Ignore, 0, 10, &mut positions, &mut rng
        );
        assert!(matches!(res, Err(Error::InvalidClass(0))));
        assert_eq!(before, positions);

        let res = dataset.sample_positions(
            GtClass::Pos, 3, 10, &mut positions, &mut rng
        );
        assert!(matches!(res, Err(Error::IndexOutOfRange { .. })));
        assert_eq!(before, positions);
    }


    #[test]
    fn sample_positions_need_ground_truth() {
        let dataset = inference_dataset(1, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let mut positions = SampleSet::new();
        let res = dataset.sample_positions(
            GtClass::Pos, 0, 10, &mut positions, &mut rng
        );
        assert!(matches!(res, Err(Error::MissingGroundTruth)));
    }


    #[test]
    fn shrink_keeps_a_subset() {
        let dataset = dataset(2, 1);
        let mut rng = StdRng::seed_from_u64(3);
        let mut positions = SampleSet::new();
        dataset.sample_positions(GtClass::Neg, 0, 60, &mut positions, &mut rng)
            .unwrap();
        let original = positions.iter().copied().collect::<HashSet<_>>();

        for k in [1, 17, 60] {
            let mut shrunk = positions.clone();
            Dataset::shrink_sample_positions(&mut shrunk, k, &mut rng).unwrap();
            assert_eq!(k, shrunk.len());

            let distinct = shrunk.iter().copied().collect::<HashSet<_>>();
            assert_eq!(k, distinct.len());
            assert!(distinct.is_subset(&original));
        }

        let mut shrunk = positions.clone();
        assert!(Dataset::shrink_sample_positions(&mut shrunk, 0, &mut rng).is_err());
        assert!(Dataset::shrink_sample_positions(&mut shrunk, 61, &mut rng).is_err());
        assert_eq!(positions, shrunk);
    }


    #[test]
    fn sample_matrix_reads_patches() {
        let dataset = dataset(1, 1);
        let positions = vec![
            SamplePosition::new(0, 0, 0),
            SamplePosition::new(0, 5, 7),
        ];
        let matrix = dataset.sample_matrix(&positions, 0, 1, 0, 2).unwrap();
        assert_eq!((2, 4), matrix.dim());

        let ch = dataset.data(0, 0);
        for (i, p) in positions.iter().enumerate() {
            let exp = [
                ch[[p.row + 1, p.col]],     ch[[p.row + 1, p.col + 1]],
                ch[[p.row + 2, p.col]],     ch[[p.row + 2, p.col + 1]],
            ];
            for (j, e) in exp.iter().enumerate() {
                assert_eq!(*e, matrix[[i, j]]);
            }
        }

        assert!(dataset.sample_matrix(&positions, 1, 0, 0, 2).is_err());
        assert!(dataset.sample_matrix(&positions, 0, 2, 0, 2).is_err());
    }


    #[test]
    fn accessors_are_soft() {
        let dataset = dataset(2, 1);
        assert_eq!((0, 0), dataset.data(5, 0).dim());
        assert_eq!((0, 0), dataset.data(0, 5).dim());
        assert_eq!((0, 0), dataset.gt(4, 0).dim());
        assert_eq!("", dataset.image_name(9));
        assert!(dataset.eval_points(9).is_empty());
        assert!(!dataset.is_feedback_image(9));

        assert_eq!("img0.png", dataset.image_name(0));
        assert!(dataset.is_feedback_image(0));
        assert_eq!(Some((-1, 1)), dataset.gt_pair_values(0));
        assert_eq!(ROWS * COLS, dataset.eval_points(1).len());
    }


    #[test]
    fn pairs_are_one_vs_one() {
        let dataset = three_class_dataset(1, 2);
        assert_eq!(3, dataset.gt_pair_count());
        assert_eq!(Some((0, 1)), dataset.gt_pair_values(0));
        assert_eq!(Some((0, 2)), dataset.gt_pair_values(1));
        assert_eq!(Some((1, 2)), dataset.gt_pair_values(2));

        // Column 10 holds the value 2, ignored by the pair (0, 1).
        assert_eq!(GtClass::Ignore, dataset.gt(0, 0)[[0, 10]]);
        assert_eq!(GtClass::Pos, dataset.gt(1, 0)[[0, 10]]);
        assert_eq!(GtClass::Neg, dataset.gt(1, 0)[[0, 0]]);
    }


    #[test]
    fn patches_are_centred_on_labeled_pixels() {
        use ndarray::Array2;
        use kernelboost::common::utils::replicate_border;

        let (rows, cols) = (8, 8);
        let pixel = |r: usize, c: usize| (r * 100 + c) as f64;
        let raw = Array2::from_shape_fn((rows, cols), |(r, c)| pixel(r, c));
        let ch = replicate_border(raw.view(), BORDER);
        let gt = Array2::from_shape_fn((rows, cols), |(_, c)| {
            if c < cols / 2 { -1 } else { 1 }
        });
        let mask = Array2::from_elem((rows, cols), 255u8);
        let dataset = DatasetBuilder::new(SAMPLE_SIZE, BORDER)
            .gt_values([-1, 1])
            .image(ImageRecord::new("ramp", vec![ch], mask).ground_truth(gt))
            .build()
            .unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let mut positions = SampleSet::new();
        dataset.sample_positions(GtClass::Pos, 0, 1_000, &mut positions, &mut rng)
            .unwrap();
        assert_eq!(rows * cols / 2, positions.len());

        let samples = dataset.sample_matrix(&positions, 0, 0, 0, SAMPLE_SIZE)
            .unwrap();
        let centre = SAMPLE_SIZE * SAMPLE_SIZE / 2;
        for (row, p) in samples.outer_iter().zip(&positions) {
            let exp = pixel(p.row, p.col);
            assert_eq!(
                exp, row[centre],
                "sample ({}, {}): expected centre {exp}, got {}.",
                p.row, p.col, row[centre]
            );
        }
    }
}
