use futures::future::join_all;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use server::entity::{round_capacity, round_record, submission_log};

use crate::common::{TestApp, answer, routes, uniform_limits};

async fn log_count(app: &TestApp, round: i32) -> u64 {
    submission_log::Entity::find()
        .filter(submission_log::Column::RoundNumber.eq(round))
        .count(&app.db)
        .await
        .expect("DB query failed")
}

mod capacity {
    use super::*;

    #[tokio::test]
    async fn first_c_correct_teams_advance_and_the_next_is_eliminated() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        let b = app.create_team(2, "B").await;
        let c = app.create_team(3, "C").await;
        app.start_event(&admin, &[1, 2, 3], uniform_limits(2)).await;

        let ra = app.submit(&a, 1, &answer(1)).await;
        assert_eq!(ra.status, 200, "{}", ra.text);
        assert_eq!(ra.body["advanced"], true);
        assert_eq!(ra.body["current_round"], 2);

        // The capacity-th arrival is still admitted.
        let rb = app.submit(&b, 1, &answer(1)).await;
        assert_eq!(rb.status, 200, "{}", rb.text);
        assert_eq!(rb.body["advanced"], true);
        assert_eq!(rb.body["eliminated"], false);

        let rc = app.submit(&c, 1, &answer(1)).await;
        assert_eq!(rc.status, 200, "{}", rc.text);
        assert_eq!(rc.body["advanced"], false);
        assert_eq!(rc.body["eliminated"], true);
        assert_eq!(rc.body["status"], "eliminated");
        assert_eq!(rc.body["current_round"], 1);
        assert_eq!(rc.body["replayed"], false);

        let team_c = app.team_row(3).await;
        assert_eq!(team_c.eliminated_round, Some(1));
        assert!(team_c.eliminated_at.is_some());
        assert_eq!(log_count(&app, 1).await, 3);
    }

    #[tokio::test]
    async fn zero_capacity_eliminates_the_first_arrival() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        let mut limits = uniform_limits(5);
        limits["1"] = json!(0);
        app.start_event(&admin, &[1], limits).await;

        let res = app.submit(&a, 1, &answer(1)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["eliminated"], true);
    }

    #[tokio::test]
    async fn rounds_count_only_their_own_submissions() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        let b = app.create_team(2, "B").await;
        app.start_event(&admin, &[1, 2], uniform_limits(1)).await;

        // A fills round 1; B never plays it. Round 2 still has its own slot.
        assert_eq!(app.submit(&a, 1, &answer(1)).await.body["advanced"], true);
        let res = app.submit(&a, 2, &answer(2)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["advanced"], true);
        assert_eq!(res.body["current_round"], 3);

        let rb = app.submit(&b, 1, &answer(1)).await;
        assert_eq!(rb.body["eliminated"], true);
    }

    #[tokio::test]
    async fn concurrent_correct_answers_fill_exactly_the_capacity() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let team_numbers: Vec<i32> = (1..=6).collect();
        let mut tokens = Vec::new();
        for &n in &team_numbers {
            tokens.push(app.create_team(n, &format!("Team {n}")).await);
        }
        app.start_event(&admin, &team_numbers, uniform_limits(3)).await;

        let expected = answer(1);
        let results = join_all(tokens.iter().map(|t| app.submit(t, 1, &expected))).await;

        for res in &results {
            assert_eq!(res.status, 200, "{}", res.text);
        }
        let advanced = results
            .iter()
            .filter(|r| r.body["advanced"] == true)
            .count();
        let eliminated = results
            .iter()
            .filter(|r| r.body["eliminated"] == true)
            .count();
        assert_eq!(advanced, 3);
        assert_eq!(eliminated, 3);
        assert_eq!(log_count(&app, 1).await, 6);
    }
}

mod idempotency {
    use super::*;

    #[tokio::test]
    async fn resubmitting_replays_the_outcome_without_counting_twice() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        let b = app.create_team(2, "B").await;
        app.start_event(&admin, &[1, 2], uniform_limits(1)).await;

        let first = app.submit(&a, 1, &answer(1)).await;
        assert_eq!(first.body["advanced"], true);

        let again = app.submit(&a, 1, &answer(1)).await;
        assert_eq!(again.status, 200, "{}", again.text);
        assert_eq!(again.body["advanced"], true);
        assert_eq!(again.body["replayed"], true);
        assert_eq!(again.body["current_round"], 2);
        assert_eq!(log_count(&app, 1).await, 1);

        // The retry did not take B's place: B is second and capacity is 1.
        let rb = app.submit(&b, 1, &answer(1)).await;
        assert_eq!(rb.body["eliminated"], true);

        let rb_again = app.submit(&b, 1, &answer(1)).await;
        assert_eq!(rb_again.status, 200, "{}", rb_again.text);
        assert_eq!(rb_again.body["eliminated"], true);
        assert_eq!(rb_again.body["replayed"], true);
        assert_eq!(log_count(&app, 1).await, 2);
    }

    #[tokio::test]
    async fn concurrent_retries_from_one_team_decide_once() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.start_event(&admin, &[1], uniform_limits(5)).await;

        let expected = answer(1);
        let results = join_all((0..4).map(|_| app.submit(&a, 1, &expected))).await;

        for res in &results {
            assert_eq!(res.status, 200, "{}", res.text);
            assert_eq!(res.body["advanced"], true);
        }
        let fresh = results
            .iter()
            .filter(|r| r.body["replayed"] == false)
            .count();
        assert_eq!(fresh, 1);
        assert_eq!(log_count(&app, 1).await, 1);
        assert_eq!(app.team_row(1).await.current_round, 2);
    }

    #[tokio::test]
    async fn wrong_then_right_consumes_exactly_one_slot() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        let b = app.create_team(2, "B").await;
        app.start_event(&admin, &[1, 2], uniform_limits(1)).await;

        let wrong = app.submit(&a, 1, "definitely wrong").await;
        assert_eq!(wrong.status, 422);
        assert_eq!(wrong.body["code"], "INCORRECT_ANSWER");
        assert_eq!(log_count(&app, 1).await, 0);

        let right = app.submit(&a, 1, &answer(1)).await;
        assert_eq!(right.body["advanced"], true);
        assert_eq!(log_count(&app, 1).await, 1);

        let rb = app.submit(&b, 1, &answer(1)).await;
        assert_eq!(rb.body["eliminated"], true);
    }
}

mod answers {
    use super::*;

    #[tokio::test]
    async fn answers_are_trimmed_and_case_folded() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.start_event(&admin, &[1], uniform_limits(5)).await;

        let res = app.submit(&a, 1, "  ANSWER-1 \n").await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["advanced"], true);
    }

    #[tokio::test]
    async fn case_sensitive_mode_rejects_a_different_case() {
        let app = TestApp::spawn_with(|c| c.rounds.case_sensitive_answers = true).await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.start_event(&admin, &[1], uniform_limits(5)).await;

        let res = app.submit(&a, 1, "ANSWER-1").await;
        assert_eq!(res.status, 422);
        assert_eq!(res.body["code"], "INCORRECT_ANSWER");

        let res = app.submit(&a, 1, " answer-1 ").await;
        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn blank_answer_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.start_event(&admin, &[1], uniform_limits(5)).await;

        let res = app.submit(&a, 1, "   ").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod access {
    use super::*;

    #[tokio::test]
    async fn no_event_access_blocks_every_round() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.upload_round(&admin, 1, &[1]).await;

        let res = app.submit(&a, 1, &answer(1)).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "ROUND_NOT_ACCESSIBLE");

        let res = app.get_with_token(&routes::round(1), &a).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "ROUND_NOT_ACCESSIBLE");

        let list = app.get_with_token(routes::ROUNDS, &a).await;
        assert_eq!(list.status, 200, "{}", list.text);
        assert!(
            list.body
                .as_array()
                .unwrap()
                .iter()
                .all(|r| r["state"] == "locked")
        );
    }

    #[tokio::test]
    async fn stopping_the_event_blocks_submissions_and_replays() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.start_event(&admin, &[1], uniform_limits(5)).await;
        assert_eq!(app.submit(&a, 1, &answer(1)).await.status, 200);

        let stop = app.post_empty_with_token(routes::ADMIN_EVENT_STOP, &admin).await;
        assert_eq!(stop.status, 200, "{}", stop.text);

        let res = app.submit(&a, 2, &answer(2)).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "ROUND_NOT_ACCESSIBLE");

        let replay = app.submit(&a, 1, &answer(1)).await;
        assert_eq!(replay.status, 403);

        // Progress survives the stop.
        assert_eq!(app.team_row(1).await.current_round, 2);
    }

    #[tokio::test]
    async fn only_the_current_round_is_playable() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.start_event(&admin, &[1], uniform_limits(5)).await;

        let ahead = app.submit(&a, 2, &answer(2)).await;
        assert_eq!(ahead.status, 403);
        assert_eq!(ahead.body["code"], "ROUND_NOT_ACCESSIBLE");

        let q1 = app.get_with_token(&routes::round(1), &a).await;
        assert_eq!(q1.status, 200, "{}", q1.text);
        assert_eq!(q1.body["question"], "Question 1");
        assert_eq!(q1.body["clue"], "Clue 1");
        assert_eq!(q1.body["state"], "unlocked");
        assert!(q1.body.get("answer").is_none());

        assert_eq!(app.submit(&a, 1, &answer(1)).await.body["advanced"], true);

        let q1 = app.get_with_token(&routes::round(1), &a).await;
        assert_eq!(q1.status, 403);
        let q2 = app.get_with_token(&routes::round(2), &a).await;
        assert_eq!(q2.status, 200, "{}", q2.text);

        let list = app.get_with_token(routes::ROUNDS, &a).await;
        let states: Vec<&str> = list
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["state"].as_str().unwrap())
            .collect();
        assert_eq!(
            states,
            vec!["completed", "unlocked", "locked", "locked", "locked", "locked", "locked", "locked"]
        );
    }

    #[tokio::test]
    async fn eliminated_team_stays_frozen_after_capacity_is_raised() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        let b = app.create_team(2, "B").await;
        app.start_event(&admin, &[1, 2], uniform_limits(1)).await;
        assert_eq!(app.submit(&a, 1, &answer(1)).await.body["advanced"], true);
        assert_eq!(app.submit(&b, 1, &answer(1)).await.body["eliminated"], true);

        // Capacities are locked while the event runs.
        let locked = app
            .put_with_token(
                routes::ADMIN_CAPACITIES,
                &json!({"participant_limits": uniform_limits(10)}),
                &admin,
            )
            .await;
        assert_eq!(locked.status, 409);
        assert_eq!(locked.body["code"], "CONFLICT");

        let stop = app.post_empty_with_token(routes::ADMIN_EVENT_STOP, &admin).await;
        assert_eq!(stop.status, 200, "{}", stop.text);
        let raised = app
            .put_with_token(
                routes::ADMIN_CAPACITIES,
                &json!({"participant_limits": uniform_limits(10)}),
                &admin,
            )
            .await;
        assert_eq!(raised.status, 200, "{}", raised.text);

        let res = app.submit(&b, 2, &answer(2)).await;
        assert_eq!(res.status, 403);

        let team_b = app.team_row(2).await;
        assert_eq!(team_b.eliminated_round, Some(1));
        assert_eq!(team_b.current_round, 1);

        let list = app.get_with_token(routes::ROUNDS, &b).await;
        let states: Vec<&str> = list
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["state"].as_str().unwrap())
            .collect();
        assert_eq!(states[0], "completed");
        assert!(states[1..].iter().all(|s| *s == "locked"));
    }

    #[tokio::test]
    async fn missing_round_record_is_reported() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.create_team(2, "B").await;
        // Only team 2 gets questions.
        app.start_event(&admin, &[2], uniform_limits(5)).await;

        let res = app.submit(&a, 1, &answer(1)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "ROUND_RECORD_NOT_FOUND");

        let q = app.get_with_token(&routes::round(1), &a).await;
        assert_eq!(q.status, 404);
        assert_eq!(q.body["code"], "ROUND_RECORD_NOT_FOUND");
    }

    #[tokio::test]
    async fn round_without_capacity_cannot_be_decided() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.start_event(&admin, &[1], uniform_limits(5)).await;
        round_capacity::Entity::delete_by_id(1)
            .exec(&app.db)
            .await
            .expect("DB delete failed");

        let res = app.submit(&a, 1, &answer(1)).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CAPACITY_NOT_CONFIGURED");
        // Nothing was claimed, so the round is still open.
        assert_eq!(log_count(&app, 1).await, 0);
        let record = round_record::Entity::find_by_id((1, 1))
            .one(&app.db)
            .await
            .expect("DB query failed")
            .expect("record should exist");
        assert!(!record.submitted);
    }

    #[tokio::test]
    async fn round_outside_range_is_rejected() {
        let app = TestApp::spawn().await;
        let a = app.create_team(1, "A").await;

        let res = app.submit(&a, 9, "x").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app.get_with_token(&routes::round(0), &a).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn admin_tokens_cannot_play() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app.submit(&admin, 1, "x").await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod ledger {
    use super::*;

    #[tokio::test]
    async fn completed_rounds_have_one_log_entry_and_a_submitted_record() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        let b = app.create_team(2, "B").await;
        app.start_event(&admin, &[1, 2], uniform_limits(1)).await;

        assert_eq!(app.submit(&a, 1, &answer(1)).await.status, 200);
        assert_eq!(app.submit(&a, 2, &answer(2)).await.status, 200);
        assert_eq!(app.submit(&b, 1, &answer(1)).await.status, 200);
        assert_eq!(app.submit(&b, 1, &answer(1)).await.status, 200);

        let entries = submission_log::Entity::find()
            .all(&app.db)
            .await
            .expect("DB query failed");
        let mut keys: Vec<(i32, i32)> = entries
            .iter()
            .map(|e| (e.team_number, e.round_number))
            .collect();
        keys.sort();
        assert_eq!(keys, vec![(1, 1), (1, 2), (2, 1)]);

        for (team_number, round) in keys {
            let record = round_record::Entity::find_by_id((team_number, round))
                .one(&app.db)
                .await
                .expect("DB query failed")
                .expect("record should exist");
            assert!(record.submitted, "team {team_number} round {round}");
        }

        let untouched = round_record::Entity::find_by_id((1, 3))
            .one(&app.db)
            .await
            .expect("DB query failed")
            .expect("record should exist");
        assert!(!untouched.submitted);
    }

    #[tokio::test]
    async fn clearing_every_round_finishes_the_event() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.start_event(&admin, &[1], uniform_limits(1)).await;

        for round in 1..=8 {
            let res = app.submit(&a, round, &answer(round)).await;
            assert_eq!(res.status, 200, "round {round}: {}", res.text);
            assert_eq!(res.body["current_round"], round + 1);
        }

        let list = app.get_with_token(routes::ROUNDS, &a).await;
        assert!(
            list.body
                .as_array()
                .unwrap()
                .iter()
                .all(|r| r["state"] == "completed")
        );
        assert_eq!(app.team_row(1).await.answers_correct, 8);
    }

    #[tokio::test]
    async fn correct_answer_count_saturates_at_its_maximum() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let a = app.create_team(1, "A").await;
        app.start_event(&admin, &[1], uniform_limits(1)).await;

        let edit = app
            .patch_with_token(
                &routes::admin_team(1),
                &json!({"answers_correct": i32::MAX}),
                &admin,
            )
            .await;
        assert_eq!(edit.status, 200, "{}", edit.text);

        let res = app.submit(&a, 1, &answer(1)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["advanced"], true);

        let team = app.team_row(1).await;
        assert_eq!(team.answers_correct, i32::MAX);
        assert_eq!(team.current_round, 2);
        assert_eq!(log_count(&app, 1).await, 1);
    }
}

mod leaderboard {
    use super::*;

    #[tokio::test]
    async fn entries_follow_submission_order() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let t3 = app.create_team(3, "Three").await;
        let t1 = app.create_team(1, "One").await;
        let t2 = app.create_team(2, "Two").await;
        app.start_event(&admin, &[1, 2, 3], uniform_limits(10)).await;

        for token in [&t3, &t1, &t2] {
            assert_eq!(app.submit(token, 1, &answer(1)).await.status, 200);
        }

        let res = app.get_with_token(&routes::leaderboard(1), &t1).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["round"], 1);
        let entries = res.body["entries"].as_array().unwrap();
        let order: Vec<i64> = entries
            .iter()
            .map(|e| e["team_number"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(entries[0]["position"], 1);
        assert_eq!(entries[0]["team_name"], "Three");

        let limited = app
            .get_with_token(&format!("{}?limit=2", routes::leaderboard(1)), &admin)
            .await;
        assert_eq!(limited.status, 200, "{}", limited.text);
        assert_eq!(limited.body["entries"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_limit_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let a = app.create_team(1, "A").await;

        let res = app
            .get_with_token(&format!("{}?limit=lots", routes::leaderboard(1)), &a)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}
