//! FIFO of pending upload jobs.

use std::collections::VecDeque;

use super::job::{JobId, UploadJob};

/// Pending uploads in submission order.
///
/// Not synchronized: the `DeliveryCoordinator` is the only writer and runs
/// on a single logical sequence of events.
#[derive(Debug, Default)]
pub struct UploadQueue {
    jobs: VecDeque<UploadJob>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, job: UploadJob) {
        self.jobs.push_back(job);
    }

    /// First job, without removing it.
    pub fn head(&self) -> Option<&UploadJob> {
        self.jobs.front()
    }

    /// Remove the job with `id`. Absent ids leave the queue untouched.
    pub fn remove_if_matching(&mut self, id: &JobId) -> Option<UploadJob> {
        let index = self.jobs.iter().position(|job| job.id() == id)?;
        self.jobs.remove(index)
    }

    pub fn remaining_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.iter().any(|job| job.id() == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &JobId> {
        self.jobs.iter().map(UploadJob::id)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::upload::job::{Geolocation, ImageFormat, PendingImage};

    fn job(name: &str) -> UploadJob {
        UploadJob::new(PendingImage {
            file_name: name.to_string(),
            caption: String::new(),
            width: 1,
            height: 1,
            location: Geolocation::default(),
            owner_id: "u1".to_string(),
            format: ImageFormat::Png,
            data: Bytes::new(),
        })
    }

    fn names(queue: &UploadQueue) -> Vec<String> {
        queue.ids().map(|id| id.to_string()).collect()
    }

    #[test]
    fn enqueue_preserves_order() {
        let mut queue = UploadQueue::new();
        queue.enqueue(job("a"));
        queue.enqueue(job("b"));
        queue.enqueue(job("c"));
        assert_eq!(names(&queue), ["au1", "bu1", "cu1"]);
        assert_eq!(queue.remaining_count(), 3);
    }

    #[test]
    fn head_peeks_without_removing() {
        let mut queue = UploadQueue::new();
        assert!(queue.head().is_none());
        queue.enqueue(job("a"));
        queue.enqueue(job("b"));
        assert_eq!(queue.head().unwrap().file_name(), "a");
        assert_eq!(queue.head().unwrap().file_name(), "a");
        assert_eq!(queue.remaining_count(), 2);
    }

    #[test]
    fn remove_if_matching_removes_by_identity() {
        let mut queue = UploadQueue::new();
        queue.enqueue(job("a"));
        queue.enqueue(job("b"));
        queue.enqueue(job("c"));

        let removed = queue.remove_if_matching(&JobId::derive("b", "u1"));
        assert_eq!(removed.unwrap().file_name(), "b");
        assert_eq!(names(&queue), ["au1", "cu1"]);
    }

    #[test]
    fn remove_if_matching_absent_is_noop() {
        let mut queue = UploadQueue::new();
        queue.enqueue(job("a"));

        assert!(queue.remove_if_matching(&JobId::derive("zzz", "u1")).is_none());
        assert!(queue.remove_if_matching(&JobId::derive("a", "someone-else")).is_none());
        assert_eq!(names(&queue), ["au1"]);

        let mut empty = UploadQueue::new();
        assert!(empty.remove_if_matching(&JobId::derive("a", "u1")).is_none());
        assert!(empty.is_empty());
    }
}
