//! Vector similarity helpers shared by the topic model

use crate::topics::vectorizer::SparseRow;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    squared_euclidean(a, b).sqrt()
}

pub fn sparse_norm(row: &SparseRow) -> f64 {
    row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
}

pub fn sparse_dot(a: &SparseRow, b: &SparseRow) -> f64 {
    let (mut i, mut j, mut dot) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}

pub fn sparse_cosine(a: &SparseRow, b: &SparseRow) -> f64 {
    let denom = sparse_norm(a) * sparse_norm(b);
    if denom == 0.0 {
        0.0
    } else {
        sparse_dot(a, b) / denom
    }
}

/// Pairwise cosine similarity matrix of sparse rows
pub fn sparse_cosine_matrix(rows: &[SparseRow]) -> Vec<Vec<f64>> {
    let norms: Vec<f64> = rows.iter().map(sparse_norm).collect();
    let n = rows.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let denom = norms[i] * norms[j];
            let sim = if denom == 0.0 {
                0.0
            } else {
                sparse_dot(&rows[i], &rows[j]) / denom
            };
            matrix[i][j] = sim;
            matrix[j][i] = sim;
        }
    }
    matrix
}

/// Scale a sparse row to unit l2 norm
pub fn l2_normalize_sparse(row: &SparseRow) -> SparseRow {
    let norm = sparse_norm(row);
    if norm == 0.0 {
        return row.clone();
    }
    row.iter().map(|&(i, v)| (i, v / norm)).collect()
}

pub fn sparse_to_dense(row: &SparseRow, n_features: usize) -> Vec<f32> {
    let mut dense = vec![0.0; n_features];
    for &(i, v) in row {
        dense[i] = v as f32;
    }
    dense
}
