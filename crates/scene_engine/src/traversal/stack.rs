//! Accumulated transform and its inverse

use crate::foundation::math::Mat4;
use crate::render::{RenderError, RenderResult};

/// Paired stack of accumulated transforms and their inverses
///
/// The top of the transform stack maps a node's local space to world space.
/// The inverse top is built alongside it from per-group inverses instead of
/// inverting the product, so `top * inverse_top` stays close to identity
/// however deep the chain is.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformStack {
    top: Mat4,
    inverse_top: Mat4,
    saved: Vec<(Mat4, Mat4)>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStack {
    /// Stack holding only the identity
    pub fn new() -> Self {
        Self {
            top: Mat4::identity(),
            inverse_top: Mat4::identity(),
            saved: Vec::new(),
        }
    }

    /// Accumulated transform, local to world
    pub fn top(&self) -> &Mat4 {
        &self.top
    }

    /// Inverse of [`top`](Self::top), world to local
    pub fn inverse_top(&self) -> &Mat4 {
        &self.inverse_top
    }

    /// Number of groups currently entered
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Run `f` with `local` pushed, popping afterwards
    ///
    /// Pushes `top * local` and `inverse(local) * inverse_top`. The pop
    /// happens exactly once whether `f` succeeds or fails. A singular
    /// `local` is rejected before anything is pushed.
    pub fn scoped<R>(
        &mut self,
        group_id: &str,
        local: &Mat4,
        f: impl FnOnce(&mut Self) -> RenderResult<R>,
    ) -> RenderResult<R> {
        let local_inverse = local
            .try_inverse()
            .ok_or_else(|| RenderError::SingularTransform(group_id.to_string()))?;

        self.saved.push((self.top, self.inverse_top));
        self.top *= local;
        self.inverse_top = local_inverse * self.inverse_top;

        let result = f(self);

        if let Some((top, inverse_top)) = self.saved.pop() {
            self.top = top;
            self.inverse_top = inverse_top;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Vec3};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_affine(rng: &mut StdRng) -> Mat4 {
        let axis = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        let offset = Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
        let scale = Vec3::new(rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0));
        Mat4::translation(&offset) * Mat4::rotation(&axis, rng.gen_range(-180.0..180.0)) * Mat4::scaling(&scale)
    }

    fn descend(stack: &mut TransformStack, rng: &mut StdRng, remaining: usize) -> RenderResult<()> {
        assert_relative_eq!(stack.top() * stack.inverse_top(), Mat4::identity(), epsilon = 1e-8);
        if remaining == 0 {
            return Ok(());
        }
        let local = random_affine(rng);
        stack.scoped("g", &local, |s| descend(s, rng, remaining - 1))
    }

    #[test]
    fn test_inverse_tracks_random_chains() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..50 {
            let mut stack = TransformStack::new();
            let depth = rng.gen_range(1..12);
            descend(&mut stack, &mut rng, depth).unwrap();
            assert_eq!(stack.depth(), 0);
            assert_eq!(stack.top(), &Mat4::identity());
        }
    }

    #[test]
    fn test_pop_happens_on_error() {
        let mut stack = TransformStack::new();
        let moved = Mat4::translation(&Vec3::new(1.0, 0.0, 0.0));
        let result: RenderResult<()> = stack.scoped("outer", &moved, |s| {
            assert_eq!(s.depth(), 1);
            Err(RenderError::InvalidRay)
        });
        assert!(result.is_err());
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.top(), &Mat4::identity());
    }

    #[test]
    fn test_singular_group_is_rejected() {
        let mut stack = TransformStack::new();
        let flat = Mat4::scaling(&Vec3::new(1.0, 0.0, 1.0));
        let result = stack.scoped("flat", &flat, |_| Ok(()));
        assert_eq!(result, Err(RenderError::SingularTransform("flat".into())));
        assert_eq!(stack.depth(), 0);
    }
}
