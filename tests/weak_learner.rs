use rand::prelude::*;
use kernelboost::prelude::*;

mod common;
use common::*;


fn samples(dataset: &Dataset, n: usize, rng: &mut StdRng)
    -> (SampleSet, Vec<f64>)
{
    let mut pos = SampleSet::new();
    let mut neg = SampleSet::new();
    dataset.sample_positions(GtClass::Pos, 0, n, &mut pos, rng).unwrap();
    dataset.sample_positions(GtClass::Neg, 0, n, &mut neg, rng).unwrap();

    let labels = std::iter::repeat(1.0).take(pos.len())
        .chain(std::iter::repeat(-1.0).take(neg.len()))
        .collect::<Vec<f64>>();
    pos.extend(neg);
    (pos, labels)
}


/// Tests for a single boosting round.
#[cfg(test)]
pub mod weak_learner_tests {
    use super::*;

    #[test]
    fn diagnostics_match_response() {
        let params = parameters();
        let dataset = dataset(2, 11);
        let sm = SmoothingMatrices::new(params.filter_size);
        let mut rng = StdRng::seed_from_u64(5);

        let (positions, labels) = samples(&dataset, 40, &mut rng);
        let n = positions.len();
        let mut weights = vec![1.0; n];
        let mut response = vec![0.0; n];

        let wl = WeakLearner::train(
            &params, &sm, &dataset, &positions,
            &mut weights, &labels, &mut response, &mut rng,
        ).unwrap();

        let mr = labels.iter()
            .zip(&response)
            .filter(|(y, f)| *y * *f < 0.0)
            .count() as f64 / n as f64;
        let loss = labels.iter()
            .zip(&response)
            .map(|(y, f)| (-y * f).exp())
            .sum::<f64>() / n as f64;

        assert_eq!(mr, wl.misclassification_rate());
        assert!((loss - wl.loss()).abs() < 1e-12, "expected {loss}, got {}.", wl.loss());

        for ((w, y), f) in weights.iter().zip(&labels).zip(&response) {
            assert!(*w > 0.0);
            assert!((w - (-y * f).exp()).abs() < 1e-12);
        }
    }


    #[test]
    fn response_is_scaled_weak_output() {
        let params = parameters();
        let dataset = dataset(2, 11);
        let sm = SmoothingMatrices::new(params.filter_size);
        let mut rng = StdRng::seed_from_u64(9);

        let (positions, labels) = samples(&dataset, 30, &mut rng);
        let n = positions.len();
        let mut weights = vec![1.0; n];
        let mut response = vec![0.25; n];
        let before = response.clone();

        let wl = WeakLearner::train(
            &params, &sm, &dataset, &positions,
            &mut weights, &labels, &mut response, &mut rng,
        ).unwrap();

        let h = wl.confidence_all(&dataset, &positions);
        for ((b, a), h) in before.iter().zip(&response).zip(&h) {
            let exp = b + wl.alpha() * h;
            assert!((exp - a).abs() < 1e-9, "expected {exp}, got {a}.");
        }
        assert!(wl.filter_bank().len() <= params.filters_no);
    }


    #[test]
    fn end_to_end_single_round() {
        let params = parameters().rounds(1);
        let dataset = dataset(2, 13);
        let sm = SmoothingMatrices::new(params.filter_size);
        assert_eq!(1, dataset.channel_count());
        assert_eq!(2, dataset.image_count());

        let mut rng = StdRng::seed_from_u64(1);
        let (positions, labels) = samples(&dataset, 40, &mut rng);
        let n = positions.len();
        let mut weights = vec![1.0; n];
        let mut response = vec![0.0; n];

        let wl = WeakLearner::train(
            &params, &sm, &dataset, &positions,
            &mut weights, &labels, &mut response, &mut rng,
        ).unwrap();

        assert!(weights.iter().all(|w| *w > 0.0));
        let disagreement = labels.iter()
            .zip(&response)
            .filter(|(y, f)| *y * *f < 0.0)
            .count() as f64 / n as f64;
        assert!(disagreement <= wl.misclassification_rate());
    }


    #[test]
    fn round_without_features_contributes_nothing() {
        use ndarray::Array2;

        let params = parameters();
        let mut builder = DatasetBuilder::new(SAMPLE_SIZE, BORDER)
            .channel_names(["flat"])
            .gt_values([-1, 1]);
        for k in 0..2 {
            let ch = Array2::zeros((ROWS + 2 * BORDER, COLS + 2 * BORDER));
            let mask = Array2::from_elem((ROWS, COLS), 255u8);
            builder.push(
                ImageRecord::new(format!("flat{k}.png"), vec![ch], mask)
                    .ground_truth(ground_truth(k))
            );
        }
        let dataset = builder.build().unwrap();
        let sm = SmoothingMatrices::new(params.filter_size);
        let mut rng = StdRng::seed_from_u64(4);

        let (positions, labels) = samples(&dataset, 30, &mut rng);
        let n = positions.len();
        let mut weights = vec![1.0; n];
        let mut response = vec![0.3; n];
        let before = response.clone();

        let wl = WeakLearner::train(
            &params, &sm, &dataset, &positions,
            &mut weights, &labels, &mut response, &mut rng,
        ).unwrap();

        assert_eq!(0.0, wl.alpha());
        assert!(wl.filter_bank().is_empty());
        assert_eq!(0, wl.tree().depth());
        assert_eq!(before, response);
        for ((w, y), f) in weights.iter().zip(&labels).zip(&response) {
            let exp = (-y * f).exp();
            assert!((w - exp).abs() < 1e-12, "expected {exp}, got {w}.");
        }
    }


    #[test]
    fn descriptor_round_trip() {
        let params = parameters();
        let dataset = dataset(2, 17);
        let sm = SmoothingMatrices::new(params.filter_size);
        let mut rng = StdRng::seed_from_u64(2);

        let (positions, labels) = samples(&dataset, 30, &mut rng);
        let n = positions.len();
        let mut weights = vec![1.0; n];
        let mut response = vec![0.0; n];
        let wl = WeakLearner::train(
            &params, &sm, &dataset, &positions,
            &mut weights, &labels, &mut response, &mut rng,
        ).unwrap();

        let text = wl.to_descriptor().unwrap();
        let res = WeakLearner::from_descriptor(&text).unwrap();
        assert_eq!(wl, res);

        assert!(WeakLearner::from_descriptor("{\"fb\": 1}").is_err());
    }
}
