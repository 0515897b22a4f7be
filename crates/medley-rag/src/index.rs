//! Exhaustive inner-product index. Vectors are L2-normalised on the way in,
//! so scores are cosine similarities.

use crate::error::RagError;

pub fn normalize_l2(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Insertion position of the matched vector.
    pub id: usize,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, vectors: Vec::new() }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<(), RagError> {
        for mut vector in vectors {
            if vector.len() != self.dim {
                return Err(RagError::Index(format!(
                    "vector has {} dims, index expects {}",
                    vector.len(),
                    self.dim
                )));
            }
            normalize_l2(&mut vector);
            self.vectors.push(vector);
        }
        Ok(())
    }

    /// Best `k` matches, highest score first. Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>, RagError> {
        if query.len() != self.dim {
            return Err(RagError::Index(format!(
                "query has {} dims, index expects {}",
                query.len(),
                self.dim
            )));
        }
        let mut query = query.to_vec();
        normalize_l2(&mut query);

        let mut hits: Vec<Hit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| Hit { id, score: dot(&query, v) })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}
