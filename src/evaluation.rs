/// Bitset of the expression slots already evaluated during one search.
///
/// An expression can be stored in several leaves; the set makes sure it is evaluated and reported
/// at most once.
#[derive(Debug)]
pub struct EvaluationResult {
    evaluated: Vec<u64>,
}

impl EvaluationResult {
    const EXPRESSIONS_PER_BUCKET: usize = 64;

    pub fn new(expressions: usize) -> Self {
        let size = expressions / Self::EXPRESSIONS_PER_BUCKET + 1;
        Self {
            evaluated: vec![0; size],
        }
    }

    #[cfg(test)]
    pub fn is_evaluated(&self, slot: usize) -> bool {
        self.evaluated
            .get(slot / Self::EXPRESSIONS_PER_BUCKET)
            .is_some_and(|entry| entry & Self::mask(slot) != 0)
    }

    /// Mark the slot as evaluated; returns `false` when it already was.
    #[inline]
    pub fn mark_evaluated(&mut self, slot: usize) -> bool {
        let bucket = slot / Self::EXPRESSIONS_PER_BUCKET;
        if bucket >= self.evaluated.len() {
            self.evaluated.resize(bucket + 1, 0);
        }
        let entry = &mut self.evaluated[bucket];
        let is_new = *entry & Self::mask(slot) == 0;
        *entry |= Self::mask(slot);
        is_new
    }

    #[inline]
    const fn mask(slot: usize) -> u64 {
        1u64 << (slot % Self::EXPRESSIONS_PER_BUCKET)
    }
}
