use core::marker::PhantomData;

use crate::error::TransformError;

/// A unit of work run by a stage on every item it receives.
///
/// `apply` returns
/// * `Ok(Some(output))` to forward `output` downstream,
/// * `Ok(None)` if there is no result for this item (e.g no frequency detected),
///   in which case nothing is forwarded,
/// * `Err(..)` if the item could not be processed. The stage reports the error
///   and continues with the next item.
///
/// A transform may keep state between calls (a capture source typically does),
/// but each call should be self-contained apart from intentional side effects.
pub trait Transform: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn apply(&mut self, input: Self::Input) -> Result<Option<Self::Output>, TransformError>;
}

/// A [`Transform`] backed by a closure. See [`transform_fn`].
pub struct FnTransform<F, I, O> {
    f: F,
    _marker: PhantomData<fn(I) -> O>,
}

/// Wraps a closure as a [`Transform`].
///
/// ```
/// use micro_tuner::pipeline::{transform_fn, Transform};
///
/// let mut double = transform_fn(|x: f32| Ok(Some(2.0 * x)));
/// assert_eq!(double.apply(1.5).unwrap(), Some(3.0));
/// ```
pub fn transform_fn<F, I, O>(f: F) -> FnTransform<F, I, O>
where
    F: FnMut(I) -> Result<Option<O>, TransformError> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    FnTransform {
        f,
        _marker: PhantomData,
    }
}

impl<F, I, O> Transform for FnTransform<F, I, O>
where
    F: FnMut(I) -> Result<Option<O>, TransformError> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn apply(&mut self, input: I) -> Result<Option<O>, TransformError> {
        (self.f)(input)
    }
}
