//! Candidate aggregation across discovery sources.

use leadenrich_shared::Candidate;

/// Deduplicated, capped list of candidates in discovery order.
///
/// Sources are offered best first, so the order of the pool is also the
/// priority order. A candidate whose identity key is already present only
/// fills in fields the existing entry lacks.
#[derive(Debug, Clone)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
    max: usize,
}

impl CandidatePool {
    pub fn new(max: usize) -> Self {
        Self {
            candidates: Vec::with_capacity(max),
            max,
        }
    }

    /// Add a candidate. Returns `true` if it took a new slot.
    pub fn offer(&mut self, candidate: Candidate) -> bool {
        let key = candidate.identity_key();
        if let Some(existing) = self.candidates.iter_mut().find(|c| c.identity_key() == key) {
            fill_missing(existing, candidate);
            return false;
        }
        if self.is_full() {
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    /// Offer every candidate in order. Returns how many took a new slot.
    pub fn extend(&mut self, candidates: impl IntoIterator<Item = Candidate>) -> usize {
        candidates
            .into_iter()
            .map(|c| self.offer(c))
            .filter(|added| *added)
            .count()
    }

    pub fn is_full(&self) -> bool {
        self.candidates.len() >= self.max
    }

    /// Free slots left.
    pub fn remaining(&self) -> usize {
        self.max.saturating_sub(self.candidates.len())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.candidates
    }
}

fn fill_missing(existing: &mut Candidate, other: Candidate) {
    let fill = |slot: &mut Option<String>, value: Option<String>| {
        if slot.is_none() {
            *slot = value;
        }
    };
    fill(&mut existing.title, other.title);
    fill(&mut existing.email, other.email);
    fill(&mut existing.phone, other.phone);
    fill(&mut existing.linkedin_url, other.linkedin_url);
    existing.verified_current |= other.verified_current;
}
