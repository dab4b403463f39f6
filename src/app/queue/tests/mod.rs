//! Unit tests for the task queue

#[cfg(test)]
mod queue_tests {
    use super::super::*;
    use std::collections::HashSet;

    fn populated(count: usize) -> TaskQueue {
        let mut queue = TaskQueue::new();
        for i in 0..count {
            let location = format!("dr17/manga/{:04}.fits", i);
            queue.append(
                location.clone(),
                format!("https://data.sdss.org/sas/{}", location),
                format!("/sas/{}", location),
            );
        }
        queue
    }

    #[test]
    fn test_append_ignores_empty_fields() {
        let mut queue = TaskQueue::new();
        assert!(queue.append("dr17/a.fits", "https://x/a.fits", "/sas/dr17/a.fits"));
        assert!(!queue.append("dr17/b.fits", "", "/sas/dr17/b.fits"));
        assert!(!queue.append("", "https://x/c.fits", "/sas/dr17/c.fits"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.stats().ignored, 2);
        assert_eq!(queue.locations(), vec!["dr17/a.fits"]);
    }

    #[test]
    fn test_shuffle_keeps_tasks() {
        let mut queue = populated(50);
        let before: HashSet<String> = queue.iter().map(|t| t.location.clone()).collect();
        queue.shuffle();
        let after: HashSet<String> = queue.iter().map(|t| t.location.clone()).collect();
        assert_eq!(before, after);
        assert_eq!(queue.len(), 50);
    }

    #[test]
    fn test_filter_include_and_exclude() {
        let mut queue = populated(10);
        let removed = queue.filter(r"000[0-4]", FilterMode::Include).unwrap();
        assert_eq!(removed, 5);
        assert_eq!(queue.len(), 5);

        let removed = queue.filter(r"0000", FilterMode::Exclude).unwrap();
        assert_eq!(removed, 1);
        assert!(queue.iter().all(|t| !t.location.contains("0000")));

        assert!(queue.filter("(", FilterMode::Include).is_err());
    }

    #[test]
    fn test_slice_bounds() {
        let queue = populated(10);
        assert_eq!(queue.slice(0, Some(3)).len(), 3);
        assert_eq!(queue.slice(8, Some(5)).len(), 2);
        assert_eq!(queue.slice(20, Some(5)).len(), 0);
        assert_eq!(queue.slice(4, None).len(), 6);
        assert_eq!(queue.slice(2, Some(1))[0].location, "dr17/manga/0002.fits");
    }

    #[test]
    fn test_truncate_to_window() {
        let mut queue = populated(10);
        queue.truncate_to(7, Some(10));
        assert_eq!(queue.locations(), vec![
            "dr17/manga/0007.fits",
            "dr17/manga/0008.fits",
            "dr17/manga/0009.fits",
        ]);
    }

    #[test]
    fn test_reset_matches_fresh_queue() {
        let mut queue = populated(5);
        queue.append("", "", "");
        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.stats(), TaskQueue::new().stats());
    }

    #[test]
    fn test_existing_count() {
        let mut queue = populated(3);
        if let Some(task) = queue.tasks_mut().next() {
            task.exists = Some(true);
        }
        assert_eq!(queue.stats().existing, 1);
    }
}
