use tracing::{debug, warn};

use crate::domain::PollCollection;
use crate::error::Result;
use crate::service::PollService;

/// Fetch the full poll listing once.
///
/// The caller replaces its local collection with the result; on error it
/// keeps what it had. Nothing is applied partially.
pub async fn load_snapshot(service: &dyn PollService) -> Result<PollCollection> {
    match service.list_polls().await {
        Ok(polls) => {
            let fetched = polls.len();
            let collection = PollCollection::from_snapshot(polls);
            if collection.len() != fetched {
                warn!(
                    "Snapshot contained {} duplicate poll ids; kept first occurrence",
                    fetched - collection.len()
                );
            }
            debug!("Snapshot loaded with {} polls", collection.len());
            Ok(collection)
        }
        Err(e) => {
            warn!("Snapshot load failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Poll, PollOption};
    use crate::error::QuickPollError;
    use crate::service::MockPollService;
    use chrono::{TimeZone, Utc};

    fn poll(id: i64) -> Poll {
        Poll {
            id,
            title: format!("Poll {}", id),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, id as u32).unwrap(),
            likes: 0,
            options: vec![PollOption {
                id: 1,
                option_text: "A".to_string(),
                votes: 0,
            }],
        }
    }

    #[tokio::test]
    async fn test_snapshot_newest_first() {
        let mut service = MockPollService::new();
        service
            .expect_list_polls()
            .times(1)
            .returning(|| Ok(vec![poll(1), poll(2), poll(3)]));

        let collection = load_snapshot(&service).await.unwrap();
        assert_eq!(collection.ids(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_snapshot_error_propagated() {
        let mut service = MockPollService::new();
        service.expect_list_polls().returning(|| {
            Err(QuickPollError::Api {
                status: 500,
                body: "boom".to_string(),
            })
        });

        let err = load_snapshot(&service).await.unwrap_err();
        assert!(matches!(err, QuickPollError::Api { status: 500, .. }));
    }
}
