use crate::domain::reference::{ReferenceCode, ReferenceSource};
use crate::error::{Result, TrackerError};
use chrono::NaiveDate;
use std::future::Future;

/// Draws references from `source` and hands each to `insert` until one is accepted.
///
/// Only `DuplicateReference` triggers another draw; any other error is returned as is.
/// Fails with `GenerationExhausted` after `attempts` collisions.
pub async fn allocate<T, F, Fut>(
    source: &dyn ReferenceSource,
    prefix: &str,
    date: NaiveDate,
    attempts: u32,
    mut insert: F,
) -> Result<T>
where
    F: FnMut(ReferenceCode) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=attempts {
        let reference = source.next(prefix, date)?;
        match insert(reference).await {
            Err(TrackerError::DuplicateReference(taken)) => {
                tracing::warn!(reference = %taken, attempt, "reference collision; regenerating");
            }
            other => return other,
        }
    }
    Err(TrackerError::GenerationExhausted { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Hands out a fixed list of references, then repeats the last one.
    struct Scripted(Mutex<Vec<&'static str>>);

    impl ReferenceSource for Scripted {
        fn next(&self, _: &str, _: NaiveDate) -> Result<ReferenceCode> {
            let mut queue = self.0.lock().unwrap();
            let next = if queue.len() > 1 { queue.remove(0) } else { queue[0] };
            ReferenceCode::parse(next)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
    }

    #[tokio::test]
    async fn test_retries_past_collisions() {
        let source = Scripted(Mutex::new(vec!["ICBB-2402-AAAAAA", "ICBB-2402-BBBBBB"]));
        let taken = ReferenceCode::parse("ICBB-2402-AAAAAA").unwrap();

        let allocated = allocate(&source, "ICBB", today(), 5, |reference| {
            let taken = taken.clone();
            async move {
                if reference == taken {
                    Err(TrackerError::DuplicateReference(reference.to_string()))
                } else {
                    Ok(reference)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(allocated.as_str(), "ICBB-2402-BBBBBB");
    }

    #[tokio::test]
    async fn test_exhausts_after_bounded_attempts() {
        let source = Scripted(Mutex::new(vec!["ICBB-2402-AAAAAA"]));
        let mut calls = 0;

        let result: Result<()> = allocate(&source, "ICBB", today(), 5, |reference| {
            calls += 1;
            async move { Err(TrackerError::DuplicateReference(reference.to_string())) }
        })
        .await;

        assert!(matches!(
            result,
            Err(TrackerError::GenerationExhausted { attempts: 5 })
        ));
        assert_eq!(calls, 5);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let source = Scripted(Mutex::new(vec!["ICBB-2402-AAAAAA"]));
        let mut calls = 0;

        let result: Result<()> = allocate(&source, "ICBB", today(), 5, |_| {
            calls += 1;
            async { Err(TrackerError::Io(std::io::Error::other("disk full"))) }
        })
        .await;

        assert!(matches!(result, Err(TrackerError::Io(_))));
        assert_eq!(calls, 1);
    }
}
