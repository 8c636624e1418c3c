use crate::catalog::FeatureMatrix;

/// Dense, symmetric all-pairs cosine similarity.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// Builds the matrix from encoded product rows. A zero-norm row has
    /// similarity 0 with everything, itself included.
    pub fn cosine(features: &FeatureMatrix) -> Self {
        let size = features.len();
        let norms: Vec<f64> = features
            .rows
            .iter()
            .map(|row| row.iter().map(|value| value * value).sum::<f64>().sqrt())
            .collect();

        let mut values = vec![0.0; size * size];
        for i in 0..size {
            if norms[i] == 0.0 {
                continue;
            }
            values[i * size + i] = 1.0;
            for j in (i + 1)..size {
                if norms[j] == 0.0 {
                    continue;
                }
                let dot: f64 =
                    features.rows[i].iter().zip(features.rows[j].iter()).map(|(a, b)| a * b).sum();
                let score = (dot / (norms[i] * norms[j])).clamp(-1.0, 1.0);
                values[i * size + j] = score;
                values[j * size + i] = score;
            }
        }

        Self { size, values }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        (i < self.size && j < self.size).then(|| self.values[i * self.size + j])
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        (i < self.size).then(|| &self.values[i * self.size..(i + 1) * self.size])
    }
}
