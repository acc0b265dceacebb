use chrono::{TimeZone, Utc};
use quickpoll::domain::{LiveEvent, Poll, PollCollection, PollOption};
use quickpoll::sync::apply_event;

fn lunch_poll() -> Poll {
    Poll {
        id: 1,
        title: "Lunch?".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        likes: 0,
        options: vec![
            PollOption {
                id: 10,
                option_text: "Pizza".to_string(),
                votes: 0,
            },
            PollOption {
                id: 11,
                option_text: "Tacos".to_string(),
                votes: 0,
            },
        ],
    }
}

fn two_polls() -> PollCollection {
    let mut second = lunch_poll();
    second.id = 2;
    second.title = "Dinner?".to_string();
    second.created_at = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
    PollCollection::from_snapshot(vec![lunch_poll(), second])
}

/// Walk through a typical session starting from an empty list.
#[test]
fn lunch_poll_scenario() {
    let polls = PollCollection::new();

    let polls = apply_event(&polls, &LiveEvent::PollCreated { poll: lunch_poll() });
    assert_eq!(polls.ids(), vec![1]);

    let polls = apply_event(
        &polls,
        &LiveEvent::VoteUpdated {
            poll_id: 1,
            option_id: 10,
            votes: 5,
        },
    );
    let poll = polls.get(1).unwrap();
    assert_eq!(poll.option(10).unwrap().votes, 5);
    assert_eq!(poll.option(11).unwrap().votes, 0);

    let before = polls.clone();
    let polls = apply_event(
        &polls,
        &LiveEvent::VoteUpdated {
            poll_id: 1,
            option_id: 99,
            votes: 1,
        },
    );
    assert_eq!(polls, before, "unknown option must leave the list unchanged");

    let polls = apply_event(
        &polls,
        &LiveEvent::LikeUpdated {
            poll_id: 1,
            likes: 3,
        },
    );
    assert_eq!(polls.get(1).unwrap().likes, 3);
}

#[test]
fn count_events_are_idempotent() {
    let events = [
        LiveEvent::VoteUpdated {
            poll_id: 2,
            option_id: 11,
            votes: 8,
        },
        LiveEvent::LikeUpdated {
            poll_id: 1,
            likes: 4,
        },
    ];

    for event in &events {
        let once = apply_event(&two_polls(), event);
        let twice = apply_event(&once, event);
        assert_eq!(once, twice, "applying {} twice changed the list", event);
    }
}

#[test]
fn updates_touch_only_their_target() {
    let before = two_polls();
    let after = apply_event(
        &before,
        &LiveEvent::VoteUpdated {
            poll_id: 2,
            option_id: 10,
            votes: 3,
        },
    );

    assert_eq!(after.get(1), before.get(1));
    let changed = after.get(2).unwrap();
    assert_eq!(changed.option(10).unwrap().votes, 3);
    assert_eq!(changed.option(11), before.get(2).unwrap().option(11));
    assert_eq!(changed.likes, before.get(2).unwrap().likes);
    assert_eq!(after.ids(), before.ids());
}

#[test]
fn unknown_poll_events_are_dropped() {
    let before = two_polls();
    let events = [
        LiveEvent::VoteUpdated {
            poll_id: 404,
            option_id: 10,
            votes: 1,
        },
        LiveEvent::LikeUpdated {
            poll_id: 404,
            likes: 1,
        },
    ];

    for event in &events {
        assert_eq!(apply_event(&before, event), before);
    }
}

#[test]
fn repeated_poll_created_keeps_single_entry_at_head() {
    let polls = two_polls();
    assert_eq!(polls.ids(), vec![2, 1]);

    let mut renamed = lunch_poll();
    renamed.title = "Lunch today?".to_string();
    let polls = apply_event(&polls, &LiveEvent::PollCreated { poll: renamed });

    assert_eq!(polls.ids(), vec![1, 2]);
    assert_eq!(polls.get(1).unwrap().title, "Lunch today?");
}

#[test]
fn out_of_order_updates_keep_last_applied() {
    let polls = two_polls();
    let newer = LiveEvent::VoteUpdated {
        poll_id: 1,
        option_id: 10,
        votes: 6,
    };
    let older = LiveEvent::VoteUpdated {
        poll_id: 1,
        option_id: 10,
        votes: 5,
    };

    let polls = apply_event(&apply_event(&polls, &newer), &older);
    assert_eq!(polls.get(1).unwrap().option(10).unwrap().votes, 5);
}

#[test]
fn events_decoded_from_wire_apply_like_typed_ones() {
    let raw = r#"{"type":"vote_updated","poll_id":1,"option_id":11,"votes":2}"#;
    let event = LiveEvent::from_json(raw).unwrap();
    let polls = apply_event(&two_polls(), &event);
    assert_eq!(polls.get(1).unwrap().option(11).unwrap().votes, 2);

    assert!(LiveEvent::from_json(r#"{"type":"poll_deleted","poll_id":1}"#).is_err());
    assert!(LiveEvent::from_json("not json").is_err());
}

#[test]
fn huge_vote_counts_from_wire_keep_percentages_sane() {
    let raw = r#"{"type":"vote_updated","poll_id":1,"option_id":10,"votes":100000000000000000}"#;
    let event = LiveEvent::from_json(raw).unwrap();
    let polls = apply_event(&two_polls(), &event);

    let poll = polls.get(1).unwrap();
    assert_eq!(poll.total_votes(), 100_000_000_000_000_000);
    assert_eq!(poll.vote_percentage(poll.option(10).unwrap().votes), 100);
    assert_eq!(poll.vote_percentage(poll.option(11).unwrap().votes), 0);
}
