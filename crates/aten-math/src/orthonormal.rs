// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
#[error("column {0} has vanishing norm, matrix cannot be orthonormalised")]
pub struct DegenerateColumn(pub usize);

/// In-place modified Gram–Schmidt on a square matrix stored row-major.
///
/// The columns are orthonormalised in order and the matrix is overwritten
/// with the Q factor. Returns the diagonal of the R factor, whose logarithms
/// accumulate into finite-time Lyapunov exponents.
pub fn modified_gram_schmidt(matrix: &mut [f64], n: usize) -> Result<Vec<f64>, DegenerateColumn> {
    assert_eq!(matrix.len(), n * n, "matrix must be square");
    let mut diagonal = Vec::with_capacity(n);
    for j in 0..n {
        let mut norm = 0.0;
        for i in 0..n {
            norm += matrix[i * n + j] * matrix[i * n + j];
        }
        let norm = norm.sqrt();
        if norm == 0.0 {
            return Err(DegenerateColumn(j));
        }
        for i in 0..n {
            matrix[i * n + j] /= norm;
        }
        for k in j + 1..n {
            let mut dot = 0.0;
            for i in 0..n {
                dot += matrix[i * n + j] * matrix[i * n + k];
            }
            for i in 0..n {
                matrix[i * n + k] -= dot * matrix[i * n + j];
            }
        }
        diagonal.push(norm);
    }
    Ok(diagonal)
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn test_gram_schmidt_identity() {
        let mut m = vec![1.0, 0.0, 0.0, 1.0];
        let diag = modified_gram_schmidt(&mut m, 2).expect("should be valid");
        assert_eq!(diag, vec![1.0, 1.0]);
        assert_eq!(m, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_gram_schmidt_scaling() {
        // columns (3, 4)^T and (0, 5)^T
        let mut m = vec![3.0, 0.0, 4.0, 5.0];
        let diag = modified_gram_schmidt(&mut m, 2).expect("should be valid");
        assert_float_eq!(diag[0], 5.0, rel <= 1e-15);
        // Q columns are orthonormal
        let dot = m[0] * m[1] + m[2] * m[3];
        assert_float_eq!(dot, 0.0, abs <= 1e-15);
        let norm0 = (m[0] * m[0] + m[2] * m[2]).sqrt();
        let norm1 = (m[1] * m[1] + m[3] * m[3]).sqrt();
        assert_float_eq!(norm0, 1.0, rel <= 1e-15);
        assert_float_eq!(norm1, 1.0, rel <= 1e-15);
    }

    #[test]
    fn test_gram_schmidt_degenerate() {
        let mut m = vec![1.0, 0.0, 1.0, 0.0];
        assert_eq!(
            modified_gram_schmidt(&mut m, 2),
            Err(DegenerateColumn(1))
        );
    }
}
