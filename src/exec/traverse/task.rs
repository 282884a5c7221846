use crate::types::VertexId;

/// Batch of vertices awaiting expansion by `chain[level]`.
///
/// Owned by exactly one party at a time: the producer building it, the task
/// queue, or the worker that dequeued it.
#[derive(Debug)]
pub(crate) struct Task {
    pub(crate) vertices: Vec<VertexId>,
    pub(crate) level: usize,
}

impl Task {
    pub(crate) fn new(level: usize) -> Self {
        Self {
            vertices: Vec::new(),
            level,
        }
    }

    pub(crate) fn with_vertices(level: usize, vertices: Vec<VertexId>) -> Self {
        Self { vertices, level }
    }

    pub(crate) fn len(&self) -> usize {
        self.vertices.len()
    }
}
