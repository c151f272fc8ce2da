use ndarray::{s, Array2, ArrayView2};
use serde::{Serialize, Deserialize};


/// The upper-left corner of a patch,
/// given in unbordered pixel coordinates of image `image`.
///
/// Since the channels are padded by `border` pixels,
/// the patch of edge `size` anchored at `(row, col)` is centred on
/// the pixel `(row, col)` whenever `border == size / 2`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize,
)]
pub struct SamplePosition {
    /// Index of the image.
    pub image: usize,
    /// Row of the upper-left corner.
    pub row: usize,
    /// Column of the upper-left corner.
    pub col: usize,
}


impl SamplePosition {
    /// Construct a new sample position.
    #[inline]
    pub fn new(image: usize, row: usize, col: usize) -> Self {
        Self { image, row, col }
    }
}


/// An ordered collection of sample positions.
pub type SampleSet = Vec<SamplePosition>;


/// A source of bordered channel matrices from which patches are read.
///
/// [`Dataset`](crate::Dataset) reads the channel of the sampled image,
/// while [`ImageChannels`] serves the channels of a single image
/// regardless of `SamplePosition::image`.
pub trait PatchSource: Sync {
    /// Returns the number of channels.
    fn channel_count(&self) -> usize;


    /// Returns the bordered matrix of `channel` for `image`.
    fn channel(&self, channel: usize, image: usize) -> ArrayView2<'_, f64>;


    /// Returns the `size x size` block read at
    /// `(pos.row + row_offset, pos.col + col_offset)`.
    #[inline]
    fn patch(
        &self,
        channel: usize,
        pos: &SamplePosition,
        row_offset: usize,
        col_offset: usize,
        size: usize,
    ) -> ArrayView2<'_, f64>
    {
        let r = pos.row + row_offset;
        let c = pos.col + col_offset;
        self.channel(channel, pos.image)
            .slice_move(s![r..r + size, c..c + size])
    }


    /// Returns a matrix whose `i`-th row is the row-major flattening of
    /// the patch read at `positions[i]`.
    fn patch_matrix(
        &self,
        positions: &[SamplePosition],
        channel: usize,
        row_offset: usize,
        col_offset: usize,
        size: usize,
    ) -> Array2<f64>
    {
        let area = size * size;
        let mut samples = Array2::zeros((positions.len(), area));

        samples.outer_iter_mut()
            .zip(positions)
            .for_each(|(mut row, pos)| {
                let patch = self.patch(
                    channel, pos, row_offset, col_offset, size
                );
                row.iter_mut()
                    .zip(patch.iter())
                    .for_each(|(dst, src)| { *dst = *src; });
            });

        samples
    }
}


/// The bordered channels of a single image.
/// Used to classify an image that is not part of a [`Dataset`](crate::Dataset).
#[derive(Debug, Clone)]
pub struct ImageChannels<'a> {
    channels: Vec<ArrayView2<'a, f64>>,
}


impl<'a> ImageChannels<'a> {
    /// Wrap the given channel views.
    pub fn new(channels: Vec<ArrayView2<'a, f64>>) -> Self {
        Self { channels }
    }


    /// Returns the `(rows, cols)` of the bordered channels.
    pub fn dim(&self) -> (usize, usize) {
        self.channels.first()
            .map(|ch| ch.dim())
            .unwrap_or((0, 0))
    }
}


impl PatchSource for ImageChannels<'_> {
    #[inline]
    fn channel_count(&self) -> usize {
        self.channels.len()
    }


    #[inline]
    fn channel(&self, channel: usize, _image: usize) -> ArrayView2<'_, f64> {
        self.channels[channel].view()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_patch_matrix_01() {
        let ch = array![
            [ 0.0,  1.0,  2.0,  3.0],
            [ 4.0,  5.0,  6.0,  7.0],
            [ 8.0,  9.0, 10.0, 11.0],
            [12.0, 13.0, 14.0, 15.0],
        ];
        let src = ImageChannels::new(vec![ch.view()]);
        let positions = vec![
            SamplePosition::new(0, 0, 0),
            SamplePosition::new(0, 1, 1),
        ];
        let mat = src.patch_matrix(&positions, 0, 0, 1, 2);
        let exp = array![
            [1.0, 2.0, 5.0, 6.0],
            [6.0, 7.0, 10.0, 11.0],
        ];
        assert_eq!(exp, mat, "expected {exp:?}, got {mat:?}.");
    }
}
