/// Visited Versioning: a node counts as visited when its tag equals the
/// current search tag, so starting a new traversal is a single increment
/// instead of a clear.
#[derive(Debug, Default)]
pub struct VisitedSet {
    tags: Vec<u32>,
    current: u32,
}

impl VisitedSet {
    pub fn new(capacity: usize) -> Self {
        Self { tags: vec![0; capacity], current: 1 }
    }

    /// Starts a fresh traversal over at least `capacity` nodes.
    pub fn reset(&mut self, capacity: usize) {
        if capacity > self.tags.len() {
            self.tags.resize(capacity, 0);
        }
        if self.current == u32::MAX {
            self.tags.fill(0);
            self.current = 1;
        } else {
            self.current += 1;
        }
    }

    /// Marks `node`. Returns `true` the first time it is seen in this traversal.
    #[inline]
    pub fn insert(&mut self, node: u32) -> bool {
        let tag = &mut self.tags[node as usize];
        if *tag == self.current {
            false
        } else {
            *tag = self.current;
            true
        }
    }
}
