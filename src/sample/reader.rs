use image::{GrayImage, RgbImage};
use image::imageops::{self, FilterType};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::info;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result, Parameters};
use crate::common::{MASK_EXCLUDED, MASK_INCLUDED};
use super::builder::{DatasetBuilder, ImageRecord};
use super::channel_op::ChannelOp;
use super::dataset::Dataset;


/// A struct that reads a [`Dataset`] from the list files
/// named in [`Parameters`].
///
/// Each list file holds one path per line,
/// relative to `Parameters::dataset_path`.
/// Empty lines and lines starting with `#` are skipped.
/// The `i`-th mask and ground truth belong to the `i`-th image.
/// The feedback list holds the file names of the feedback images.
///
/// When `Parameters::gt_list` is empty,
/// the dataset is read for inference.
pub struct DatasetReader<'a> {
    params: &'a Parameters,
}


impl<'a> DatasetReader<'a> {
    /// Construct a new reader.
    pub fn new(params: &'a Parameters) -> Self {
        Self { params }
    }


    /// Read, decode and decompose every listed image.
    /// Fails on the first invalid path or dimension mismatch.
    pub fn read(&self) -> Result<Dataset> {
        let params = self.params;
        let ops = ChannelOp::parse_list(&params.channel_list)?;

        let images = self.read_list(&params.img_list)?;
        let masks = self.read_list(&params.mask_list)?;
        if images.len() != masks.len() {
            return Err(Error::InvalidParameter(format!(
                "{} images listed, but {} masks",
                images.len(), masks.len(),
            )));
        }

        let gts = if params.gt_list.is_empty() {
            None
        } else {
            let gts = self.read_list(&params.gt_list)?;
            if gts.len() != images.len() {
                return Err(Error::InvalidParameter(format!(
                    "{} images listed, but {} ground truths",
                    images.len(), gts.len(),
                )));
            }
            Some(gts)
        };

        let feedback = self.read_feedback_list()?;

        let records = images.par_iter()
            .zip(&masks[..])
            .enumerate()
            .map(|(i, (img, mask))| {
                let gt = gts.as_ref().map(|gts| gts[i].as_path());
                self.read_record(&ops, img, mask, gt, &feedback)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut builder = DatasetBuilder::new(
                params.sample_size, params.border_size
            )
            .eval_stride(params.eval_stride)
            .channel_names(ops.iter().map(|op| op.name()));
        if gts.is_some() {
            builder = builder.gt_values(params.gt_values.iter().copied());
        }
        for record in records {
            builder.push(record);
        }

        let dataset = builder.build()?;
        info!(
            "Read {} images ({} channels) from `{}`",
            dataset.image_count(),
            dataset.channel_count(),
            params.dataset_path.display(),
        );
        Ok(dataset)
    }


    fn read_record(
        &self,
        ops: &[ChannelOp],
        img_path: &Path,
        mask_path: &Path,
        gt_path: Option<&Path>,
        feedback: &HashSet<String>,
    ) -> Result<ImageRecord>
    {
        let factor = self.params.img_rescale_factor;
        let border = self.params.border_size;

        let img = image::open(img_path)?.to_rgb8();
        let (width, height) = img.dimensions();
        let img = rescale_rgb(img, factor);

        let mask = rescale_gray(image::open(mask_path)?.to_luma8(), factor);
        let mask = gray_to_array(&mask)
            .mapv(|v| if v > 0 { MASK_INCLUDED } else { MASK_EXCLUDED });

        let channels = ops.iter()
            .map(|op| op.apply(&img, border))
            .collect::<Vec<_>>();

        let name = img_path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let is_feedback = feedback.contains(&name);

        let mut record = ImageRecord::new(name, channels, mask)
            .path(img_path)
            .original_size(height as usize, width as usize)
            .feedback(is_feedback);

        if let Some(gt_path) = gt_path {
            let gt = rescale_gray(image::open(gt_path)?.to_luma8(), factor);
            record = record.ground_truth(gray_to_array(&gt).mapv(i32::from));
        }
        Ok(record)
    }


    /// Read a list file and resolve its entries against the dataset root.
    fn read_list(&self, list: &str) -> Result<Vec<PathBuf>> {
        let root = &self.params.dataset_path;
        read_lines(&root.join(list))?
            .into_iter()
            .map(|line| {
                let path = root.join(line);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(Error::InvalidPath(path))
                }
            })
            .collect()
    }


    fn read_feedback_list(&self) -> Result<HashSet<String>> {
        let list = &self.params.feedback_list;
        if list.is_empty() {
            return Ok(HashSet::new());
        }
        let lines = read_lines(&self.params.dataset_path.join(list))?;
        let names = lines.into_iter()
            .map(|line| {
                Path::new(&line).file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or(line)
            })
            .collect();
        Ok(names)
    }
}


fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(Error::InvalidPath(path.to_path_buf()));
    }
    let lines = fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();
    Ok(lines)
}


fn scaled(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let w = ((width as f64 * factor).round() as u32).max(1);
    let h = ((height as f64 * factor).round() as u32).max(1);
    (w, h)
}


fn rescale_rgb(img: RgbImage, factor: f64) -> RgbImage {
    if factor == 1f64 { return img; }
    let (w, h) = scaled(img.width(), img.height(), factor);
    imageops::resize(&img, w, h, FilterType::Triangle)
}


// Labels must not be interpolated.
fn rescale_gray(img: GrayImage, factor: f64) -> GrayImage {
    if factor == 1f64 { return img; }
    let (w, h) = scaled(img.width(), img.height(), factor);
    imageops::resize(&img, w, h, FilterType::Nearest)
}


fn gray_to_array(img: &GrayImage) -> Array2<u8> {
    let (width, height) = img.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(r, c)| {
        img.get_pixel(c as u32, r as u32)[0]
    })
}
