use dashmap::DashMap;

/// Invalidation stamps for cached views. Mutating file actions bump the
/// stamp for the path they were given; consumers key cached renders off
/// the current generation.
#[derive(Default)]
pub struct ViewCache {
    generations: DashMap<String, u64>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revalidate(&self, path: &str) {
        let mut entry = self.generations.entry(path.to_string()).or_insert(0);
        *entry += 1;
        log::debug!("revalidated {path} (generation {})", *entry);
    }

    pub fn generation(&self, path: &str) -> u64 {
        self.generations.get(path).map(|g| *g).unwrap_or(0)
    }
}
