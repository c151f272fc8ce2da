use image::{GrayImage, RgbImage, Luma};
use imageproc::definitions::Image;
use imageproc::{filter, gradients, map};
use ndarray::Array2;
use serde::{Serialize, Deserialize};

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};
use crate::common::utils;


const U8_SCALE: f64 = 255.0;
const GAUSSIAN_SIGMA: f32 = 1.0;
const MEDIAN_RADIUS: u32 = 1;


/// The operations that turn a decoded image into one data channel.
///
/// Every operation consumes an RGB image and a border width
/// and produces a border-padded matrix
/// of size `(height + 2 * border) x (width + 2 * border)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOp {
    /// Grayscale conversion.
    Gray,
    /// Red channel.
    Red,
    /// Green channel.
    Green,
    /// Green channel smoothed by a Gaussian filter with sigma `1`.
    Gaussian,
    /// Grayscale image smoothed by a `3 x 3` median filter.
    Median,
    /// Laplacian of the green channel.
    Laplacian,
    /// Sobel derivative of the green channel along X.
    SobelX,
    /// Sobel derivative of the green channel along Y.
    SobelY,
}


impl ChannelOp {
    /// Every available operation.
    pub const ALL: [Self; 8] = [
        Self::Gray,
        Self::Red,
        Self::Green,
        Self::Gaussian,
        Self::Median,
        Self::Laplacian,
        Self::SobelX,
        Self::SobelY,
    ];


    /// Returns the name used in the channel list.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gray      => "gray",
            Self::Red       => "red",
            Self::Green     => "green",
            Self::Gaussian  => "gaussian",
            Self::Median    => "median",
            Self::Laplacian => "laplacian",
            Self::SobelX    => "sobel_x",
            Self::SobelY    => "sobel_y",
        }
    }


    /// Parse a whole channel list.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>> {
        names.iter()
            .map(|name| name.as_ref().parse())
            .collect()
    }


    /// Apply the operation to `src` and pad the result with
    /// `border` replicated pixels.
    pub fn apply(&self, src: &RgbImage, border: usize) -> Array2<f64> {
        let channel = match self {
            Self::Gray => {
                let gray = image::imageops::grayscale(src);
                gray_to_array(&gray)
            },
            Self::Red => {
                let red: GrayImage = map::red_channel(src);
                gray_to_array(&red)
            },
            Self::Green => gray_to_array(&green(src)),
            Self::Gaussian => {
                let blurred = filter::gaussian_blur_f32(
                    &green(src), GAUSSIAN_SIGMA
                );
                gray_to_array(&blurred)
            },
            Self::Median => {
                let gray = image::imageops::grayscale(src);
                let median = filter::median_filter(
                    &gray, MEDIAN_RADIUS, MEDIAN_RADIUS
                );
                gray_to_array(&median)
            },
            Self::Laplacian => {
                derivative_to_array(&filter::laplacian_filter(&green(src)))
            },
            Self::SobelX => {
                derivative_to_array(&gradients::horizontal_sobel(&green(src)))
            },
            Self::SobelY => {
                derivative_to_array(&gradients::vertical_sobel(&green(src)))
            },
        };

        utils::replicate_border(channel.view(), border)
    }
}


impl FromStr for ChannelOp {
    type Err = Error;
    fn from_str(name: &str) -> Result<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| {
                Error::InvalidParameter(format!("unknown channel `{name}`"))
            })
    }
}


impl fmt::Display for ChannelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}


fn green(src: &RgbImage) -> GrayImage {
    map::green_channel(src)
}


fn gray_to_array(src: &GrayImage) -> Array2<f64> {
    let (width, height) = src.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(r, c)| {
        src.get_pixel(c as u32, r as u32)[0] as f64 / U8_SCALE
    })
}


fn derivative_to_array(src: &Image<Luma<i16>>) -> Array2<f64> {
    let (width, height) = src.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(r, c)| {
        src.get_pixel(c as u32, r as u32)[0] as f64 / U8_SCALE
    })
}
