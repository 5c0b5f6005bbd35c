mod common;

use common::{identity, property, saved_search, FakeApi};
use housing_sync::models::Credential;
use housing_sync::mutation::{DELETE_SEARCH_FAILED, FAVORITES_FAILED, SAVE_SEARCH_FAILED};
use housing_sync::session::{LOGIN_FAILED, SESSION_EXPIRED};
use housing_sync::{ApiError, Config, HomeSearch, MutationOutcome};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn app(api: &Arc<FakeApi>) -> HomeSearch {
    HomeSearch::new(api.clone(), Config::default())
}

async fn logged_in(api: &Arc<FakeApi>, user_id: &str) -> HomeSearch {
    api.add_user(identity(user_id));
    let app = app(api);
    app.restore_session(Credential::new(format!("token-{}", user_id)))
        .await
        .unwrap();
    app
}

#[tokio::test]
async fn favorite_shows_up_before_backend_answers() {
    let api = FakeApi::new();
    let app = logged_in(&api, "1").await;
    let release = api.gate_mutation();

    let toggle = app.toggle_favorite("42");
    assert!(app.favorites().contains("42"));

    release.send(()).unwrap();
    assert_eq!(toggle.await, MutationOutcome::Committed(true));
    assert!(app.favorites().contains("42"));
    assert_eq!(app.favorites().last_error(), None);
    assert_eq!(api.calls_starting_with("save_listing"), vec!["save_listing 1/42"]);
}

#[tokio::test]
async fn failed_favorite_is_rolled_back() {
    let api = FakeApi::new();
    let app = logged_in(&api, "1").await;
    api.fail_mutations(true);

    let outcome = app.toggle_favorite("42").await;
    assert_eq!(
        outcome,
        MutationOutcome::Reverted {
            message: FAVORITES_FAILED.to_string()
        }
    );
    assert!(!app.favorites().contains("42"));
    assert_eq!(app.favorites().last_error().as_deref(), Some(FAVORITES_FAILED));
}

#[tokio::test]
async fn removing_a_favorite_restores_it_on_failure() {
    let api = FakeApi::new();
    api.set_saved_listings("1", &["7"]);
    let app = logged_in(&api, "1").await;
    assert!(app.favorites().contains("7"));

    api.fail_mutations(true);
    let toggle = app.toggle_favorite("7");
    assert!(!app.favorites().contains("7"));
    toggle.await;

    assert!(app.favorites().contains("7"));
    assert_eq!(
        api.calls_starting_with("delete_saved_listing"),
        vec!["delete_saved_listing 1/7"]
    );
}

#[tokio::test]
async fn favorites_need_a_session() {
    let api = FakeApi::new();
    let app = app(&api);

    assert_eq!(app.toggle_favorite("42").await, MutationOutcome::Skipped);
    assert!(app.favorites().is_empty());
    assert_eq!(app.favorites().last_error(), None);
    assert!(api.calls_starting_with("save_listing").is_empty());
}

#[tokio::test]
async fn switching_user_clears_favorites_first() {
    let api = FakeApi::new();
    api.set_saved_listings("1", &["7", "8"]);
    api.set_saved_listings("2", &["9"]);
    api.add_user(identity("2"));
    let app = logged_in(&api, "1").await;
    assert_eq!(app.favorites().len(), 2);

    let switch = app.restore_session(Credential::new("token-2"));
    tokio::pin!(switch);
    // Not polled yet: nothing changed
    assert_eq!(app.favorites().len(), 2);

    switch.await.unwrap();
    assert_eq!(app.favorites().ids().into_iter().collect::<Vec<_>>(), vec!["9".to_string()]);

    app.logout().await;
    assert!(app.favorites().is_empty());
    assert!(app.saved_searches().list().is_empty());
    assert_eq!(app.identity(), None);
}

#[tokio::test]
async fn late_failure_from_previous_user_is_ignored() {
    let api = FakeApi::new();
    api.set_saved_listings("2", &["5"]);
    api.add_user(identity("2"));
    let app = logged_in(&api, "1").await;
    api.fail_mutations(true);
    let release = api.gate_mutation();

    let toggle = app.toggle_favorite("42");
    tokio::pin!(toggle);
    tokio::select! {
        biased;
        _ = toggle.as_mut() => panic!("toggle finished before its gate was released"),
        _ = tokio::task::yield_now() => {}
    }

    app.restore_session(Credential::new("token-2")).await.unwrap();
    release.send(()).unwrap();
    assert!(matches!(toggle.await, MutationOutcome::Reverted { .. }));

    assert!(app.favorites().contains("5"));
    assert_eq!(app.favorites().last_error(), None);
}

#[tokio::test]
async fn saved_searches_load_with_identity() {
    let api = FakeApi::new();
    api.set_saved_searches("1", vec![saved_search("3", "Vasastan"), saved_search("4", "Solna")]);
    let app = logged_in(&api, "1").await;

    let queries: Vec<String> = app.saved_searches().list().into_iter().map(|s| s.query).collect();
    assert_eq!(queries, vec!["Vasastan", "Solna"]);
    assert_eq!(api.calls_starting_with("saved_searches"), vec!["saved_searches 1"]);
}

#[tokio::test]
async fn saving_current_search_prepends_then_replaces() {
    let api = FakeApi::new();
    api.set_saved_searches("1", vec![saved_search("3", "Vasastan")]);
    let app = logged_in(&api, "1").await;
    let session = app.search_session("free_text_search=Södermalm&max_rooms=3&property_types=Apartment");
    let release = api.gate_mutation();

    let save = app.save_current_search(&session, true);
    let pending = app.saved_searches().list();
    assert_eq!(pending.len(), 2);
    assert!(pending[0].id.starts_with("pending-"));
    assert_eq!(pending[0].query, "Södermalm");

    release.send(()).unwrap();
    let created = match save.await {
        MutationOutcome::Committed(created) => created,
        other => panic!("unexpected outcome: {:?}", other),
    };

    let list = app.saved_searches().list();
    assert_eq!(list[0].id, created.id);
    assert!(list[0].filters.is_some());
    assert_eq!(list[1].id, "3");

    let body = &api.created()[0];
    assert_eq!(body.query, "Södermalm");
    assert_eq!(body.rooms_max, 3);
    assert_eq!(body.property_types, vec!["apartment".to_string()]);
    assert!(body.send_email);
}

#[tokio::test]
async fn failed_save_removes_placeholder() {
    let api = FakeApi::new();
    let app = logged_in(&api, "1").await;
    let session = app.search_session("location=Uppsala");
    api.fail_mutations(true);

    let outcome = app.save_current_search(&session, false).await;
    assert_eq!(
        outcome,
        MutationOutcome::Reverted {
            message: SAVE_SEARCH_FAILED.to_string()
        }
    );
    assert!(app.saved_searches().list().is_empty());
    assert_eq!(app.saved_searches().last_error().as_deref(), Some(SAVE_SEARCH_FAILED));
}

#[tokio::test]
async fn blank_search_is_not_saved() {
    let api = FakeApi::new();
    let app = logged_in(&api, "1").await;
    let session = app.search_session("");

    assert_eq!(app.save_current_search(&session, false).await, MutationOutcome::Skipped);
    assert!(api.created().is_empty());
}

#[tokio::test]
async fn failed_delete_puts_search_back_in_place() {
    let api = FakeApi::new();
    api.set_saved_searches(
        "1",
        vec![
            saved_search("3", "Vasastan"),
            saved_search("4", "Solna"),
            saved_search("5", "Täby"),
        ],
    );
    let app = logged_in(&api, "1").await;
    api.fail_mutations(true);

    let delete = app.delete_saved_search("4");
    assert_eq!(app.saved_searches().list().len(), 2);
    assert_eq!(
        delete.await,
        MutationOutcome::Reverted {
            message: DELETE_SEARCH_FAILED.to_string()
        }
    );

    let ids: Vec<String> = app.saved_searches().list().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["3", "4", "5"]);
}

#[tokio::test]
async fn deleting_unknown_search_is_a_no_op() {
    let api = FakeApi::new();
    let app = logged_in(&api, "1").await;

    assert_eq!(app.delete_saved_search("missing").await, MutationOutcome::Skipped);
    assert!(api.calls_starting_with("delete_saved_search").is_empty());
}

#[tokio::test]
async fn login_and_expired_session_messages() {
    let api = FakeApi::new();
    api.add_user(identity("1"));
    let app = app(&api);

    assert!(app.login("user1", "wrong").await.is_err());
    assert_eq!(app.auth().state().error.as_deref(), Some(LOGIN_FAILED));

    let identity = app.login("user1", "secret").await.unwrap();
    assert_eq!(identity.user_id, "1");
    assert_eq!(app.auth().state().error, None);

    assert!(app.restore_session(Credential::new("stale")).await.is_err());
    let state = app.auth().state();
    assert_eq!(state.identity, None);
    assert_eq!(state.error.as_deref(), Some(SESSION_EXPIRED));
    assert_eq!(app.favorites().len(), 0);
}

#[tokio::test]
async fn failed_login_drops_previous_user_data() {
    let api = FakeApi::new();
    api.set_saved_listings("1", &["7"]);
    let app = logged_in(&api, "1").await;
    assert!(app.favorites().contains("7"));

    assert!(matches!(
        app.login("user1", "wrong").await,
        Err(ApiError::Unauthorized)
    ));
    assert_eq!(app.identity(), None);
    assert!(app.favorites().is_empty());

    assert_eq!(app.toggle_favorite("42").await, MutationOutcome::Skipped);
    assert!(api.calls_starting_with("save_listing").is_empty());
}

#[tokio::test]
async fn login_overtaken_by_logout_changes_nothing() {
    let api = FakeApi::new();
    api.add_user(identity("1"));
    api.set_saved_listings("1", &["7"]);
    let app = app(&api);
    let release = api.gate_login();

    let login = app.login("user1", "secret");
    tokio::pin!(login);
    tokio::select! {
        biased;
        _ = login.as_mut() => panic!("login finished before its gate was released"),
        _ = tokio::task::yield_now() => {}
    }

    app.logout().await;
    release.send(()).unwrap();
    assert!(matches!(login.await, Err(ApiError::Cancelled)));

    assert_eq!(app.identity(), None);
    assert!(!app.auth().state().loading);
    assert!(app.favorites().is_empty());
    assert!(api.calls_starting_with("saved_listings").is_empty());
}

#[tokio::test]
async fn pending_search_cannot_be_deleted_yet() {
    let api = FakeApi::new();
    let app = logged_in(&api, "1").await;
    let session = app.search_session("free_text_search=Solna");
    let release = api.gate_mutation();

    let save = app.save_current_search(&session, false);
    let placeholder = app.saved_searches().list()[0].id.clone();
    assert!(placeholder.starts_with("pending-"));

    assert_eq!(app.delete_saved_search(&placeholder).await, MutationOutcome::Skipped);
    assert!(api.calls_starting_with("delete_saved_search").is_empty());
    assert_eq!(app.saved_searches().list()[0].id, placeholder);

    release.send(()).unwrap();
    assert!(matches!(save.await, MutationOutcome::Committed(_)));
    assert_eq!(app.saved_searches().list().len(), 1);
}

#[tokio::test]
async fn detail_falls_back_to_listing_images() {
    let api = FakeApi::new();
    api.set_results("", vec![property("1", "Götgatan 1"), property("2", "Ringvägen 3")]);
    let app = app(&api);

    let detail = app.listing_detail("2").await.unwrap().unwrap();
    assert_eq!(detail.property.address, "Ringvägen 3");
    assert_eq!(detail.gallery, detail.property.images);
    assert!(detail.open_houses.is_empty());

    assert_eq!(app.listing_detail("99").await.unwrap(), None);
}

#[tokio::test]
async fn similar_listings_skip_the_current_one() {
    let api = FakeApi::new();
    api.set_results(
        "",
        vec![property("1", "A"), property("2", "B"), property("3", "C")],
    );
    let app = app(&api);

    let similar = app.similar_listings("2", 2).await.unwrap();
    let ids: Vec<&str> = similar.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert!(api.search_params()[0].contains(&("status_name".to_string(), "for_sale".to_string())));
}

#[tokio::test]
async fn similar_listings_limit_saturates() {
    let api = FakeApi::new();
    api.set_results("", vec![property("1", "A"), property("2", "B")]);
    let app = app(&api);

    let similar = app.similar_listings("2", u32::MAX).await.unwrap();
    assert_eq!(similar.len(), 1);
    assert!(api.search_params()[0].contains(&("limit".to_string(), "4294967295".to_string())));
}
