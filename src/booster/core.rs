//! Provides `Booster` trait.
use crate::Result;

use std::ops::ControlFlow;


/// The trait [`Booster`] defines the standard framework of Boosting.
///
/// You need to implement [`Booster::preprocess`],
/// [`Booster::boost`],
/// and [`Booster::postprocess`]
/// to write a new boosting algorithm.
pub trait Booster {
    /// The combined hypothesis produced by the booster.
    type Output;


    /// Returns the name of the boosting algorithm.
    fn name(&self) -> &str;


    /// Returns the settings of the booster as `(key, value)` pairs.
    fn info(&self) -> Option<Vec<(&str, String)>> {
        None
    }


    /// A main function that runs boosting algorithm.
    fn run(&mut self) -> Result<Self::Output> {
        self.preprocess()?;

        let flow = (1..).try_for_each(|iter| {
            match self.boost(iter) {
                Ok(ControlFlow::Continue(())) => ControlFlow::Continue(()),
                Ok(ControlFlow::Break(_)) => ControlFlow::Break(Ok(())),
                Err(e) => ControlFlow::Break(Err(e)),
            }
        });
        if let ControlFlow::Break(Err(e)) = flow {
            return Err(e);
        }

        self.postprocess()
    }


    /// Pre-processing for `self`.
    /// As you can see in [`Booster::run`],
    /// This method is called before the boosting process.
    fn preprocess(&mut self) -> Result<()>;


    /// Boosting step per iteration.
    /// This method returns
    /// `ControlFlow::Continue(())` if the boosting should go on,
    /// `ControlFlow::Break(terminated_iter)` otherwise.
    /// Iterations are numbered from `1`.
    fn boost(&mut self, iteration: usize) -> Result<ControlFlow<usize>>;


    /// Post-processing.
    /// This method returns the combined hypothesis.
    fn postprocess(&mut self) -> Result<Self::Output>;
}
