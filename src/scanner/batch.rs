//! Credential batching

/// Split `credentials` into consecutive batches of at most `batch_size`
///
/// A `batch_size` of zero is treated as one.
pub fn partition(credentials: &[String], batch_size: usize) -> Vec<&[String]> {
    credentials.chunks(batch_size.max(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user{}", i)).collect()
    }

    #[test]
    fn test_twelve_by_five() {
        let all = creds(12);
        let sizes: Vec<usize> = partition(&all, 5).iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
    }

    #[test]
    fn test_batches_preserve_order() {
        let all = creds(7);
        let batches = partition(&all, 3);
        let flat: Vec<&String> = batches.iter().flat_map(|b| b.iter()).collect();
        assert_eq!(flat, all.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_exact_multiple_and_small_lists() {
        assert_eq!(partition(&creds(10), 5).len(), 2);
        assert_eq!(partition(&creds(1), 5).len(), 1);
        assert!(partition(&creds(0), 5).is_empty());
        assert_eq!(partition(&creds(3), 0).len(), 3);
    }
}
