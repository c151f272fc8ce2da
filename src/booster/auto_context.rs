//! Builds the augmented dataset of the auto-context stage.
use ndarray::Array2;
use rayon::prelude::*;
use tracing::info;

use crate::{Error, Result};
use crate::sample::{Dataset, GtClass};
use crate::sample::builder::label_pair;
use crate::sample::dataset::GroundTruth;
use super::boosted_classifier::BoostedClassifier;


impl Dataset {
    /// Build a new dataset whose channels are the channels of `src`
    /// followed by one channel per classifier of `classifiers`,
    /// holding its dense score over every image.
    ///
    /// If `src` carries a ground truth,
    /// the new dataset carries a single gt pair:
    /// the highest gt value is positive,
    /// every other gt value is negative.
    ///
    /// `src` is left untouched.
    pub fn with_auto_context(src: &Dataset, classifiers: &[BoostedClassifier])
        -> Result<Dataset>
    {
        if classifiers.is_empty() {
            return Err(Error::InvalidParameter(
                "auto-context requires at least one classifier".into()
            ));
        }

        let sample_size = src.sample_size();
        let border_size = src.border_size();
        info!(
            "computing {} auto-context channels over {} images",
            classifiers.len(), src.image_count(),
        );

        // scores[image][classifier]
        let scores = (0..src.image_count()).into_par_iter()
            .map(|image| {
                classifiers.iter()
                    .map(|classifier| {
                        classifier.classify_full_image(
                            src.channels_for_image(image),
                            sample_size,
                            border_size,
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let mut data = src.data.clone();
        let mut channel_names = src.channel_names.clone();
        for k in 0..classifiers.len() {
            channel_names.push(format!("autocontext_{k}"));
            data.push(Vec::with_capacity(src.image_count()));
        }
        let offset = src.channel_count();
        for image_scores in scores {
            for (k, score) in image_scores.into_iter().enumerate() {
                data[offset + k].push(score);
            }
        }

        let ground_truth = src.ground_truth.as_ref()
            .map(final_ground_truth)
            .transpose()?;

        Ok(Dataset {
            data,
            channel_names,
            image_names: src.image_names.clone(),
            image_paths: src.image_paths.clone(),
            original_sizes: src.original_sizes.clone(),
            feedback: src.feedback.clone(),
            sample_size,
            border_size,
            masks: src.masks.clone(),
            eval_points: src.eval_points.clone(),
            ground_truth,
        })
    }
}


/// The single pair of the final stage:
/// the highest value against every other one.
fn final_ground_truth(gt: &GroundTruth) -> Result<GroundTruth> {
    let (lowest, highest) = match (gt.values.first(), gt.values.last()) {
        (Some(&lo), Some(&hi)) if lo < hi => (lo, hi),
        _ => {
            return Err(Error::InvalidParameter(format!(
                "at least two ground-truth values are required, got {:?}",
                gt.values,
            )));
        },
    };

    let values = &gt.values;
    let labeler = |v: i32| {
        if v == highest {
            GtClass::Pos
        } else if values.binary_search(&v).is_ok() {
            GtClass::Neg
        } else {
            GtClass::Ignore
        }
    };
    let pair = gt.original.iter()
        .map(|original| label_pair(original, labeler))
        .collect::<Vec<Array2<GtClass>>>();

    Ok(GroundTruth {
        pairs: vec![pair],
        pair_values: vec![(lowest, highest)],
        values: gt.values.clone(),
        original: gt.original.clone(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_final_ground_truth_01() {
        let gt = GroundTruth {
            pairs: Vec::new(),
            pair_values: vec![(0, 1), (0, 2), (1, 2)],
            values: vec![0, 1, 2],
            original: vec![array![[0, 1], [2, 7]]],
        };
        let res = final_ground_truth(&gt).unwrap();

        assert_eq!(vec![(0, 2)], res.pair_values);
        let exp = array![
            [GtClass::Neg, GtClass::Neg],
            [GtClass::Pos, GtClass::Ignore],
        ];
        assert_eq!(exp, res.pairs[0][0], "expected {exp:?}, got {:?}.", res.pairs[0][0]);
    }
}
