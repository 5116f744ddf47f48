//! Dense element-local kernels.
//!
//! All element data is stored contiguously per element; these kernels work
//! on one element's slice at a time.

use faer::Mat;

/// out = A u
#[inline]
pub fn apply(a: &Mat<f64>, u: &[f64], out: &mut [f64]) {
    debug_assert_eq!(a.ncols(), u.len());
    debug_assert_eq!(a.nrows(), out.len());
    for (i, o) in out.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (j, &uj) in u.iter().enumerate() {
            sum += a[(i, j)] * uj;
        }
        *o = sum;
    }
}

/// out += alpha A u
#[inline]
pub fn apply_add(a: &Mat<f64>, alpha: f64, u: &[f64], out: &mut [f64]) {
    for (i, o) in out.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (j, &uj) in u.iter().enumerate() {
            sum += a[(i, j)] * uj;
        }
        *o += alpha * sum;
    }
}

/// out = A^T u
#[inline]
pub fn apply_transpose(a: &Mat<f64>, u: &[f64], out: &mut [f64]) {
    debug_assert_eq!(a.nrows(), u.len());
    debug_assert_eq!(a.ncols(), out.len());
    out.fill(0.0);
    for (i, &ui) in u.iter().enumerate() {
        if ui == 0.0 {
            continue;
        }
        for (j, o) in out.iter_mut().enumerate() {
            *o += a[(i, j)] * ui;
        }
    }
}

/// Matrix-vector product returning a new vector.
pub fn mat_vec(a: &Mat<f64>, u: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.nrows()];
    apply(a, u, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Mat<f64> {
        let mut a = Mat::zeros(2, 3);
        a[(0, 0)] = 1.0;
        a[(0, 2)] = 2.0;
        a[(1, 1)] = -1.0;
        a
    }

    #[test]
    fn test_apply_and_transpose() {
        let a = sample();
        assert_eq!(mat_vec(&a, &[1.0, 2.0, 3.0]), vec![7.0, -2.0]);

        let mut out = vec![9.0; 3];
        apply_transpose(&a, &[1.0, 1.0], &mut out);
        assert_eq!(out, vec![1.0, -1.0, 2.0]);

        let mut acc = vec![1.0, 1.0];
        apply_add(&a, 0.5, &[1.0, 2.0, 3.0], &mut acc);
        assert_eq!(acc, vec![4.5, 0.0]);
    }
}
