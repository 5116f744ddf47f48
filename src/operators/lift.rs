//! LIFT matrices for surface contributions.
//!
//! LIFT_f = M^{-1} E_f^T M_f, where E_f extracts the nodes of face f and
//! M_f is the face mass matrix on the unit face. LIFT_f has shape
//! (n_nodes, n_face_nodes) and maps face values to volume contributions.

use crate::local::LocalDiscretization;
use faer::Mat;

/// LIFT matrix of one face.
pub fn lift_matrix(ldis: &dyn LocalDiscretization, face: usize) -> Mat<f64> {
    let inv_mass = ldis.inverse_mass_matrix();
    let face_mass = ldis.face_mass_matrix(face);
    let indices = &ldis.face_indices()[face];
    let n = ldis.node_count();
    let nf = indices.len();

    let mut lift = Mat::zeros(n, nf);
    for i in 0..n {
        for (j, &node) in indices.iter().enumerate() {
            let minv = inv_mass[(i, node)];
            if minv == 0.0 {
                continue;
            }
            for k in 0..nf {
                lift[(i, k)] += minv * face_mass[(j, k)];
            }
        }
    }
    lift
}

/// LIFT matrices of all faces.
pub fn lift_matrices(ldis: &dyn LocalDiscretization) -> Vec<Mat<f64>> {
    (0..ldis.face_count()).map(|f| lift_matrix(ldis, f)).collect()
}
